//! Trivialization wrapper and conversion helpers.

use anyhow::{bail, Result};
use loom_core::curve::PolynomialCurve;
use loom_core::root_system::ClassicalRootSystems;
use loom_core::trivialization::{Path, TrivializationContext, TrivializationSettings};
use num_complex::Complex64;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmTrivialization {
    context: TrivializationContext<PolynomialCurve>,
}

/// Overview payload returned by `summary`.
#[derive(Serialize)]
struct TrivializationSummary {
    algebra: String,
    sheet_count: usize,
    base_point: Complex64,
    reference_sheets: Vec<Complex64>,
    branch_point_labels: Vec<String>,
    irregular_singularity_labels: Vec<String>,
    ramification_point_count: usize,
}

pub(crate) fn zip_complex(re: &[f64], im: &[f64], what: &str) -> Result<Vec<Complex64>> {
    if re.len() != im.len() {
        bail!(
            "{} need as many imaginary parts as real parts ({} vs {}).",
            what,
            im.len(),
            re.len()
        );
    }
    Ok(re
        .iter()
        .zip(im)
        .map(|(&r, &i)| Complex64::new(r, i))
        .collect())
}

pub(crate) fn interleave(values: &[Complex64]) -> Vec<f64> {
    values.iter().flat_map(|v| [v.re, v.im]).collect()
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn build_context(
    equation: &str,
    param_names: Vec<String>,
    param_re: &[f64],
    param_im: &[f64],
    algebra: &str,
    representation: usize,
    punctures_re: &[f64],
    punctures_im: &[f64],
    settings: TrivializationSettings,
) -> Result<TrivializationContext<PolynomialCurve>> {
    if param_names.len() != param_re.len() {
        bail!(
            "Got {} parameter names but {} values.",
            param_names.len(),
            param_re.len()
        );
    }
    let values = zip_complex(param_re, param_im, "Parameters")?;
    let params: Vec<(String, Complex64)> = param_names.into_iter().zip(values).collect();
    let punctures = zip_complex(punctures_re, punctures_im, "Punctures")?;
    let curve = PolynomialCurve::parse(equation, &params)?;
    TrivializationContext::from_provider(
        curve,
        &ClassicalRootSystems,
        algebra,
        representation,
        &punctures,
        settings,
    )
}

impl WasmTrivialization {
    fn summary_payload(&self) -> TrivializationSummary {
        let ctx = &self.context;
        TrivializationSummary {
            algebra: ctx.root_system().algebra.to_string(),
            sheet_count: ctx.root_system().sheet_count(),
            base_point: ctx.base_point(),
            reference_sheets: ctx.reference_sheets().to_vec(),
            branch_point_labels: ctx.branch_points().iter().map(|bp| bp.label.clone()).collect(),
            irregular_singularity_labels: ctx
                .irregular_singularities()
                .iter()
                .map(|irr| irr.label.clone())
                .collect(),
            ramification_point_count: ctx.ramification_points().len(),
        }
    }
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

#[wasm_bindgen]
impl WasmTrivialization {
    /// `settings` may be `undefined` or any subset of the settings fields.
    #[wasm_bindgen(constructor)]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        equation: &str,
        param_names: Vec<String>,
        param_re: Vec<f64>,
        param_im: Vec<f64>,
        algebra: &str,
        representation: u32,
        punctures_re: Vec<f64>,
        punctures_im: Vec<f64>,
        settings: JsValue,
    ) -> Result<WasmTrivialization, JsValue> {
        console_error_panic_hook::set_once();

        let settings: TrivializationSettings = if settings.is_undefined() || settings.is_null() {
            TrivializationSettings::default()
        } else {
            from_value(settings)
                .map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))?
        };
        let context = build_context(
            equation,
            param_names,
            &param_re,
            &param_im,
            algebra,
            representation as usize,
            &punctures_re,
            &punctures_im,
            settings,
        )
        .map_err(to_js_error)?;
        Ok(WasmTrivialization { context })
    }

    pub fn base_point(&self) -> Vec<f64> {
        interleave(&[self.context.base_point()])
    }

    pub fn reference_sheets(&self) -> Vec<f64> {
        interleave(self.context.reference_sheets())
    }

    pub fn summary(&self) -> Result<JsValue, JsValue> {
        to_value(&self.summary_payload())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn branch_point_count(&self) -> usize {
        self.context.branch_points().len()
    }

    pub fn branch_points(&self) -> Result<JsValue, JsValue> {
        to_value(self.context.branch_points())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn irregular_singularities(&self) -> Result<JsValue, JsValue> {
        to_value(self.context.irregular_singularities())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn diagnostics(&self) -> Result<JsValue, JsValue> {
        to_value(self.context.diagnostics())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Sheet values at `z`, interleaved.
    pub fn sheets_at(&self, re: f64, im: f64) -> Result<Vec<f64>, JsValue> {
        let sheets = self
            .context
            .sheets_at(Complex64::new(re, im))
            .map_err(to_js_error)?;
        Ok(interleave(&sheets))
    }

    /// Samples of the path to `z`, interleaved.
    pub fn path_to(&self, re: f64, im: f64) -> Vec<f64> {
        interleave(self.context.path_to(Complex64::new(re, im)).points())
    }

    /// Monodromy images along a closed path given by interleaved points.
    pub fn monodromy_around(&self, points: Vec<f64>) -> Result<Vec<u32>, JsValue> {
        let (re, im): (Vec<f64>, Vec<f64>) = points
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .unzip();
        let points = zip_complex(&re, &im, "Path points").map_err(to_js_error)?;
        let path = Path::closed(points, self.context.settings().accuracy).map_err(to_js_error)?;
        let permutation = self
            .context
            .monodromy_around(&path)
            .map_err(to_js_error)?;
        Ok(permutation.images().iter().map(|&i| i as u32).collect())
    }
}

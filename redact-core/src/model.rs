use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, Tensor, TypedFact, TypedOp, tvec,
};

use crate::preprocess::InputSize;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Wrapper around a runnable ONNX detection graph.
///
/// This struct handles loading the ONNX graph, preparing it for execution,
/// and running inference. It is layout-agnostic: output decoding belongs to
/// the postprocess stage.
#[derive(Debug)]
pub struct OnnxModel {
    runnable: RunnableModel,
    input_size: InputSize,
}

impl OnnxModel {
    /// Load and optimize an ONNX detection graph for a specific input size.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: InputSize) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable_model(path, true) {
            Ok(model) => {
                debug!(
                    "detection model {} optimized successfully ({}x{})",
                    path.display(),
                    input_size.width,
                    input_size.height
                );
                model
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "detection model {} failed optimized load ({}); falling back to decluttered graph (~2x slower).\nError chain:\n{}",
                    path.display(),
                    optimize_msg,
                    chain_msg.trim_end()
                );
                let decluttered = load_runnable_model(path, false).with_context(|| {
                    format!(
                        "fallback to decluttered detection graph failed after optimize error: {optimize_msg}"
                    )
                })?;
                debug!(
                    "detection model {} running in decluttered mode ({}x{})",
                    path.display(),
                    input_size.width,
                    input_size.height
                );
                decluttered
            }
        };

        Ok(Self {
            runnable,
            input_size,
        })
    }

    /// Execute the model with a preprocessed tensor and return the raw
    /// output tensors in graph order.
    ///
    /// Anchor-free detectors emit a single fused tensor; darknet-style grid
    /// detectors emit one tensor per scale.
    pub fn run(&self, input: Tensor) -> Result<Vec<Tensor>> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("detection model execution failed: {e}"))?;

        let tensors: Vec<Tensor> = outputs
            .into_iter()
            .map(|value| value.into_tensor())
            .collect();

        anyhow::ensure!(!tensors.is_empty(), "detection model produced no outputs");
        Ok(tensors)
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }
}

fn load_runnable_model(path: &Path, optimized: bool) -> Result<RunnableModel> {
    // Load the model and let tract infer shapes from the ONNX file. The
    // input size is used for preprocessing and coordinate scaling; the graph
    // itself must match the ONNX file's declared input shape.
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize detection graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make detection graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check detection graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter detection graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make detection graph runnable: {e}"))
    }
}

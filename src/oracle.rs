//! Segmentation oracle interface.
//!
//! The annotator never runs a model itself. It hands the current image and
//! prompt points to a [`SegmentationOracle`] and gets back ranked candidate
//! masks. [`CommandOracle`] talks to an external program over stdin/stdout.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use ndarray::{Array3, Axis};
use ndarray_npy::ReadNpyExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{ImageSize, Mask, Point};

/// Everything an oracle needs for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub image_path: PathBuf,
    pub image_size: ImageSize,
    /// User points first, then synthesized negatives
    pub points: Vec<Point>,
}

impl OracleRequest {
    /// `[x, y]` per prompt.
    pub fn point_coords(&self) -> Vec<[i32; 2]> {
        self.points.iter().map(|p| [p.x, p.y]).collect()
    }

    /// 1 (positive) or 0 (negative) per prompt.
    pub fn point_labels(&self) -> Vec<u8> {
        self.points.iter().map(|p| p.polarity.label()).collect()
    }
}

/// Candidate masks and their scores, in the oracle's order.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    pub masks: Vec<Mask>,
    pub scores: Vec<f32>,
}

impl Prediction {
    /// Check the shape of oracle output against the request.
    pub fn validate(&self, image_size: ImageSize) -> Result<()> {
        if self.masks.is_empty() {
            return Err(Error::oracle("oracle returned no masks"));
        }
        if self.masks.len() != self.scores.len() {
            return Err(Error::oracle(format!(
                "{} masks but {} scores",
                self.masks.len(),
                self.scores.len()
            )));
        }
        if let Some((index, mask)) = self
            .masks
            .iter()
            .enumerate()
            .find(|(_, mask)| mask.size() != image_size)
        {
            let size = mask.size();
            return Err(Error::oracle(format!(
                "mask {} is {}x{}, expected {}x{}",
                index, size.width, size.height, image_size.width, image_size.height
            )));
        }
        if let Some(score) = self.scores.iter().find(|s| !s.is_finite()) {
            return Err(Error::oracle(format!("non-finite score {}", score)));
        }
        Ok(())
    }
}

/// Produces candidate masks for a set of prompt points.
pub trait SegmentationOracle {
    /// Short identifier used in logs.
    fn id(&self) -> &str;

    /// Predict masks for the request. Output is validated by the caller.
    fn predict(&mut self, request: &OracleRequest) -> Result<Prediction>;
}

/// JSON written to the oracle program's stdin.
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    image_path: &'a Path,
    width: u32,
    height: u32,
    point_coords: Vec<[i32; 2]>,
    point_labels: Vec<u8>,
    /// Where the program must write an `N x H x W` float32 `.npy`
    masks_path: &'a Path,
}

/// JSON expected on the oracle program's stdout.
#[derive(Debug, Deserialize)]
struct WireResponse {
    scores: Vec<f32>,
}

/// Oracle backed by an external program.
///
/// Each call spawns `program args...`, writes the request as JSON to its
/// stdin, reads `{"scores": [...]}` from its stdout and loads the masks from
/// the `.npy` file named in the request.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
    calls: u64,
}

impl CommandOracle {
    /// Build from a command line; the first word is the program.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut words = command.split_whitespace().map(String::from);
        let program = words
            .next()
            .ok_or_else(|| Error::oracle("empty oracle command"))?;
        Ok(Self::new(program, words.collect()))
    }

    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            scratch_dir: std::env::temp_dir(),
            calls: 0,
        }
    }

    /// Directory for the per-call mask files.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn masks_path(&self) -> PathBuf {
        self.scratch_dir.join(format!(
            "seglabel-masks-{}-{}.npy",
            std::process::id(),
            self.calls
        ))
    }

    fn run(&self, request: &OracleRequest, masks_path: &Path) -> Result<WireResponse> {
        let payload = serde_json::to_vec(&WireRequest {
            image_path: &request.image_path,
            width: request.image_size.width,
            height: request.image_size.height,
            point_coords: request.point_coords(),
            point_labels: request.point_labels(),
            masks_path,
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::oracle(format!("failed to start '{}': {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .map_err(|e| Error::oracle(format!("failed to send request: {}", e)))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| Error::oracle(format!("oracle did not finish: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::oracle(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::oracle(format!("unreadable oracle response: {}", e)))
    }
}

impl SegmentationOracle for CommandOracle {
    fn id(&self) -> &str {
        &self.program
    }

    fn predict(&mut self, request: &OracleRequest) -> Result<Prediction> {
        let masks_path = self.masks_path();
        self.calls += 1;

        let response = self.run(request, &masks_path)?;
        let masks = read_masks(&masks_path);
        if let Err(e) = std::fs::remove_file(&masks_path) {
            log::debug!("Could not remove {:?}: {}", masks_path, e);
        }

        Ok(Prediction {
            masks: masks?,
            scores: response.scores,
        })
    }
}

/// Load an `N x H x W` float32 array and split it into masks.
pub fn read_masks(path: &Path) -> Result<Vec<Mask>> {
    let file = File::open(path)
        .map_err(|e| Error::oracle(format!("mask file {:?} not readable: {}", path, e)))?;
    let stack = Array3::<f32>::read_npy(file)
        .map_err(|e| Error::oracle(format!("mask file {:?} is not N x H x W float32: {}", path, e)))?;
    log::debug!("Read mask stack {:?} from {:?}", stack.shape(), path);
    Ok(stack
        .axis_iter(Axis(0))
        .map(|mask| Mask::from_array(mask.to_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::WriteNpyExt;

    fn prediction(sizes: &[(u32, u32)], scores: &[f32]) -> Prediction {
        Prediction {
            masks: sizes
                .iter()
                .map(|&(w, h)| Mask::empty(ImageSize::new(w, h)))
                .collect(),
            scores: scores.to_vec(),
        }
    }

    #[test]
    fn test_request_coords_and_labels() {
        let request = OracleRequest {
            image_path: PathBuf::from("a.png"),
            image_size: ImageSize::new(10, 10),
            points: vec![Point::positive(1, 2), Point::negative(3, 4)],
        };
        assert_eq!(request.point_coords(), vec![[1, 2], [3, 4]]);
        assert_eq!(request.point_labels(), vec![1, 0]);
    }

    #[test]
    fn test_validate_accepts_well_formed_output() {
        let p = prediction(&[(10, 8), (10, 8)], &[0.9, 0.1]);
        assert!(p.validate(ImageSize::new(10, 8)).is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_output() {
        let size = ImageSize::new(10, 8);
        for p in [
            prediction(&[], &[]),
            prediction(&[(10, 8)], &[0.9, 0.1]),
            prediction(&[(8, 10)], &[0.9]),
            prediction(&[(10, 8)], &[f32::NAN]),
        ] {
            assert!(matches!(p.validate(size), Err(Error::OracleFailure { .. })));
        }
    }

    #[test]
    fn test_empty_command_line() {
        assert!(CommandOracle::from_command_line("   ").is_err());
        let oracle = CommandOracle::from_command_line("python3 predict.py --fast").unwrap();
        assert_eq!(oracle.id(), "python3");
        assert_eq!(oracle.args, vec!["predict.py", "--fast"]);
    }

    #[test]
    fn test_missing_program_is_oracle_failure() {
        let mut oracle = CommandOracle::new("seglabel-no-such-oracle-binary", Vec::new());
        let request = OracleRequest {
            image_path: PathBuf::from("a.png"),
            image_size: ImageSize::new(4, 4),
            points: vec![Point::positive(1, 1)],
        };
        assert!(matches!(
            oracle.predict(&request),
            Err(Error::OracleFailure { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_oracle_reads_scores_and_masks() {
        let dir = tempfile::tempdir().unwrap();
        let mut stack = Array3::<f32>::zeros((2, 4, 6));
        stack[[0, 1, 2]] = 1.0;
        let file = File::create(dir.path().join(format!(
            "seglabel-masks-{}-0.npy",
            std::process::id()
        )))
        .unwrap();
        stack.write_npy(file).unwrap();

        let mut oracle = CommandOracle::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"cat >/dev/null; echo '{"scores": [0.25, 0.75]}'"#.to_string(),
            ],
        )
        .with_scratch_dir(dir.path());
        let request = OracleRequest {
            image_path: PathBuf::from("a.png"),
            image_size: ImageSize::new(6, 4),
            points: vec![Point::positive(2, 1)],
        };

        let prediction = oracle.predict(&request).unwrap();
        assert_eq!(prediction.scores, vec![0.25, 0.75]);
        assert_eq!(prediction.masks.len(), 2);
        assert!(prediction.masks[0].is_set(2, 1));
        assert!(prediction.validate(request.image_size).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_oracle_failure_exit() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = CommandOracle::new(
            "sh",
            vec!["-c".to_string(), "cat >/dev/null; echo boom >&2; exit 3".to_string()],
        )
        .with_scratch_dir(dir.path());
        let request = OracleRequest {
            image_path: PathBuf::from("a.png"),
            image_size: ImageSize::new(4, 4),
            points: vec![Point::positive(1, 1)],
        };
        let err = oracle.predict(&request).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}

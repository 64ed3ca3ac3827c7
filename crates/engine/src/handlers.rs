use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use tokio::sync::mpsc;
use tracing::debug;

use offload_core::{BatchItem, RegexHit, TaskEvent, TaskId, TaskOutput, TaskRequest};
use offload_kernels::{self as kernels, Progress};

use crate::codec::{ImageCodec, MediaCodec};
use crate::error::EngineError;

/// The full, closed set of task handlers an execution context dispatches
/// over. Matrix kinds call straight into the kernel library; image and
/// media kinds call the injected collaborator codecs; regex kinds run on
/// the `regex` crate.
#[derive(Clone)]
pub struct HandlerSet {
    image: Arc<dyn ImageCodec>,
    media: Arc<dyn MediaCodec>,
}

impl HandlerSet {
    pub fn new(image: Arc<dyn ImageCodec>, media: Arc<dyn MediaCodec>) -> Self {
        Self { image, media }
    }

    /// Run one task to its terminal event. Called on a blocking thread;
    /// emits progress along the way and always ends with exactly one
    /// `complete` or `error` for this task.
    pub(crate) fn execute(&self, id: TaskId, request: TaskRequest, reply: &mpsc::Sender<TaskEvent>) {
        let kind = request.kind();
        let _ = reply.blocking_send(TaskEvent::progress(id, 5, Some(format!("starting {kind}"))));

        match self.run(id, request, reply) {
            Ok(data) => {
                let _ = reply.blocking_send(TaskEvent::progress(id, 100, None));
                let _ = reply.blocking_send(TaskEvent::complete(id, data));
            }
            Err(err) => {
                debug!(task = %id, kind, error = %err, "task failed");
                let _ = reply.blocking_send(TaskEvent::error(id, err));
            }
        }
    }

    fn run(
        &self,
        id: TaskId,
        request: TaskRequest,
        reply: &mpsc::Sender<TaskEvent>,
    ) -> Result<TaskOutput, EngineError> {
        match request {
            TaskRequest::CompressImage { image, quality } => {
                let image = self.image.compress(&image, quality)?;
                Ok(TaskOutput::Image { image })
            }
            TaskRequest::BatchCompress { images, quality } => {
                let total = images.len();
                let mut items = Vec::with_capacity(total);
                for (index, image) in images.iter().enumerate() {
                    let compressed = self.image.compress(image, quality)?;
                    items.push(BatchItem {
                        index,
                        image: compressed,
                    });
                    let pct = (10 + (index + 1) * 85 / total.max(1)) as u8;
                    let _ = reply.blocking_send(TaskEvent::progress(
                        id,
                        pct,
                        Some(format!("compressed {}/{}", index + 1, total)),
                    ));
                }
                Ok(TaskOutput::Batch { items })
            }
            TaskRequest::MatrixMultiply { matrices } => {
                let [a, b] = &matrices;
                let mut sink = progress_sink(id, reply);
                let matrix = kernels::multiply(a, b, &mut Progress::new(&mut sink))?;
                Ok(TaskOutput::Matrix { matrix })
            }
            TaskRequest::MatrixInverse { matrix } => {
                let mut sink = progress_sink(id, reply);
                let matrix = kernels::invert(&matrix, &mut Progress::new(&mut sink))?;
                Ok(TaskOutput::Matrix { matrix })
            }
            TaskRequest::MatrixDeterminant { matrix } => {
                let mut sink = progress_sink(id, reply);
                let value = kernels::determinant(&matrix, &mut Progress::new(&mut sink))?;
                Ok(TaskOutput::Scalar { value })
            }
            TaskRequest::MatrixEigenvalues { matrix } => {
                let mut sink = progress_sink(id, reply);
                let eigen = kernels::dominant_eigenvalue(&matrix, &mut Progress::new(&mut sink))?;
                Ok(TaskOutput::Eigen { eigen })
            }
            TaskRequest::AudioConvert { audio, format } => {
                let media = self.media.convert_audio(&audio, &format)?;
                Ok(TaskOutput::Media { media })
            }
            TaskRequest::AudioAnalyze { audio } => {
                let analysis = self.media.analyze_audio(&audio)?;
                Ok(TaskOutput::Analysis { analysis })
            }
            TaskRequest::VideoTrim {
                video,
                start_secs,
                end_secs,
            } => {
                if !(start_secs >= 0.0 && end_secs > start_secs) {
                    return Err(EngineError::Codec(format!(
                        "invalid trim range {start_secs}..{end_secs}"
                    )));
                }
                let media = self.media.trim_video(&video, start_secs, end_secs)?;
                Ok(TaskOutput::Media { media })
            }
            TaskRequest::VideoCompress { video, quality } => {
                let media = self.media.compress_video(&video, quality)?;
                Ok(TaskOutput::Media { media })
            }
            TaskRequest::RegexMatch {
                pattern,
                flags,
                text,
            } => {
                let (re, global) = build_regex(&pattern, &flags)?;
                let mut matches = Vec::new();
                for caps in re.captures_iter(&text) {
                    let Some(whole) = caps.get(0) else { continue };
                    matches.push(RegexHit {
                        text: whole.as_str().to_string(),
                        start: whole.start(),
                        groups: caps
                            .iter()
                            .skip(1)
                            .map(|g| g.map(|g| g.as_str().to_string()))
                            .collect(),
                    });
                    if !global {
                        break;
                    }
                }
                Ok(TaskOutput::Matches { matches })
            }
            TaskRequest::RegexReplace {
                pattern,
                flags,
                text,
                replacement,
            } => {
                let (re, global) = build_regex(&pattern, &flags)?;
                let replacements = if global {
                    re.find_iter(&text).count()
                } else {
                    usize::from(re.is_match(&text))
                };
                let text = if global {
                    re.replace_all(&text, replacement.as_str())
                } else {
                    re.replace(&text, replacement.as_str())
                };
                Ok(TaskOutput::Replaced {
                    text: text.into_owned(),
                    replacements,
                })
            }
        }
    }
}

/// Progress closure bound to one task, forwarding kernel checkpoints over
/// the task's reply channel.
fn progress_sink(id: TaskId, reply: &mpsc::Sender<TaskEvent>) -> impl FnMut(u8) + '_ {
    move |pct| {
        let _ = reply.blocking_send(TaskEvent::progress(id, pct, None));
    }
}

/// Map a JS-style flag string onto the regex builder. `g` is not a real
/// builder flag; it selects match-all / replace-all behavior.
fn build_regex(pattern: &str, flags: &str) -> Result<(Regex, bool), EngineError> {
    let mut builder = RegexBuilder::new(pattern);
    let mut global = false;
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'U' => {
                builder.swap_greed(true);
            }
            other => {
                return Err(EngineError::Regex(format!("unsupported flag `{other}`")));
            }
        }
    }
    let re = builder.build()?;
    Ok((re, global))
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_core::Matrix;

    /// Codec that "compresses" by halving the byte count.
    struct HalvingCodec;

    impl ImageCodec for HalvingCodec {
        fn compress(&self, image: &[u8], _quality: u8) -> Result<Vec<u8>, EngineError> {
            Ok(image[..image.len() / 2].to_vec())
        }
    }

    struct NoMedia;

    impl MediaCodec for NoMedia {
        fn convert_audio(&self, _: &[u8], _: &str) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::Codec("no audio backend".into()))
        }
        fn analyze_audio(&self, _: &[u8]) -> Result<serde_json::Value, EngineError> {
            Err(EngineError::Codec("no audio backend".into()))
        }
        fn trim_video(&self, _: &[u8], _: f64, _: f64) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::Codec("no video backend".into()))
        }
        fn compress_video(&self, _: &[u8], _: u8) -> Result<Vec<u8>, EngineError> {
            Err(EngineError::Codec("no video backend".into()))
        }
    }

    fn handlers() -> HandlerSet {
        HandlerSet::new(Arc::new(HalvingCodec), Arc::new(NoMedia))
    }

    /// Run a handler synchronously and collect every event it emitted.
    fn run(request: TaskRequest) -> (TaskId, Vec<TaskEvent>) {
        let id = TaskId::new();
        // Roomy buffer: nothing drains concurrently in these tests.
        let (tx, mut rx) = mpsc::channel(1024);
        handlers().execute(id, request, &tx);
        drop(tx);

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        (id, events)
    }

    fn terminal(events: &[TaskEvent]) -> &TaskEvent {
        events.last().expect("no events emitted")
    }

    #[test]
    fn matrix_multiply_completes_with_progress() {
        let m = Matrix::identity(2);
        let (id, events) = run(TaskRequest::MatrixMultiply {
            matrices: [m.clone(), m],
        });

        assert!(events.len() >= 2, "expected progress framing, got {events:?}");
        assert!(events.iter().all(|e| e.task_id() == id));
        // Exactly one terminal event, and it is last.
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Matrix { matrix },
                ..
            } => assert!(matrix.approx_eq(&Matrix::identity(2), 1e-12)),
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn dimension_mismatch_yields_single_error() {
        let (_, events) = run(TaskRequest::MatrixMultiply {
            matrices: [Matrix::zeros(2, 3), Matrix::zeros(2, 2)],
        });
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        match terminal(&events) {
            TaskEvent::Error { error, .. } => {
                assert!(error.contains("dimension mismatch"), "got: {error}")
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn singular_inverse_yields_error() {
        let singular = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        let (_, events) = run(TaskRequest::MatrixInverse { matrix: singular });
        match terminal(&events) {
            TaskEvent::Error { error, .. } => assert!(error.contains("singular")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn singular_determinant_completes_with_zero() {
        let singular = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        let (_, events) = run(TaskRequest::MatrixDeterminant { matrix: singular });
        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Scalar { value },
                ..
            } => assert_eq!(*value, 0.0),
            other => panic!("expected complete(0), got {other:?}"),
        }
    }

    #[test]
    fn batch_compress_reports_per_item_progress() {
        let (_, events) = run(TaskRequest::BatchCompress {
            images: vec![vec![0u8; 8], vec![1u8; 8], vec![2u8; 8]],
            quality: 80,
        });

        let labels: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TaskEvent::Progress {
                    message: Some(m), ..
                } if m.starts_with("compressed") => Some(m.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["compressed 1/3", "compressed 2/3", "compressed 3/3"]);

        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Batch { items },
                ..
            } => {
                assert_eq!(items.len(), 3);
                assert!(items.iter().enumerate().all(|(i, item)| item.index == i));
                assert!(items.iter().all(|item| item.image.len() == 4));
            }
            other => panic!("expected batch result, got {other:?}"),
        }
    }

    #[test]
    fn media_without_backend_errors_cleanly() {
        let (_, events) = run(TaskRequest::AudioConvert {
            audio: vec![1, 2, 3],
            format: "ogg".into(),
        });
        match terminal(&events) {
            TaskEvent::Error { error, .. } => assert!(error.contains("no audio backend")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn video_trim_range_is_validated() {
        let (_, events) = run(TaskRequest::VideoTrim {
            video: vec![0],
            start_secs: 5.0,
            end_secs: 2.0,
        });
        match terminal(&events) {
            TaskEvent::Error { error, .. } => assert!(error.contains("invalid trim range")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn regex_match_first_without_global_flag() {
        let (_, events) = run(TaskRequest::RegexMatch {
            pattern: r"\d+".into(),
            flags: String::new(),
            text: "a1 b22 c333".into(),
        });
        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Matches { matches },
                ..
            } => {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].text, "1");
                assert_eq!(matches[0].start, 1);
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn regex_match_all_with_global_flag() {
        let (_, events) = run(TaskRequest::RegexMatch {
            pattern: r"(\w)(\d)".into(),
            flags: "g".into(),
            text: "a1 b2".into(),
        });
        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Matches { matches },
                ..
            } => {
                assert_eq!(matches.len(), 2);
                assert_eq!(matches[1].groups, vec![Some("b".into()), Some("2".into())]);
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn regex_replace_respects_global_flag() {
        let (_, events) = run(TaskRequest::RegexReplace {
            pattern: "o".into(),
            flags: "g".into(),
            text: "foo boo".into(),
            replacement: "0".into(),
        });
        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Replaced { text, replacements },
                ..
            } => {
                assert_eq!(text, "f00 b00");
                assert_eq!(*replacements, 4);
            }
            other => panic!("expected replaced, got {other:?}"),
        }

        let (_, events) = run(TaskRequest::RegexReplace {
            pattern: "o".into(),
            flags: String::new(),
            text: "foo".into(),
            replacement: "0".into(),
        });
        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Replaced { text, replacements },
                ..
            } => {
                assert_eq!(text, "f0o");
                assert_eq!(*replacements, 1);
            }
            other => panic!("expected replaced, got {other:?}"),
        }
    }

    #[test]
    fn case_insensitive_flag() {
        let (_, events) = run(TaskRequest::RegexMatch {
            pattern: "rust".into(),
            flags: "gi".into(),
            text: "Rust RUST rust".into(),
        });
        match terminal(&events) {
            TaskEvent::Complete {
                data: TaskOutput::Matches { matches },
                ..
            } => assert_eq!(matches.len(), 3),
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn invalid_pattern_and_flag_are_errors() {
        let (_, events) = run(TaskRequest::RegexMatch {
            pattern: "(".into(),
            flags: String::new(),
            text: "x".into(),
        });
        assert!(matches!(terminal(&events), TaskEvent::Error { .. }));

        let (_, events) = run(TaskRequest::RegexMatch {
            pattern: "x".into(),
            flags: "z".into(),
            text: "x".into(),
        });
        match terminal(&events) {
            TaskEvent::Error { error, .. } => assert!(error.contains("unsupported flag")),
            other => panic!("expected error, got {other:?}"),
        }
    }
}

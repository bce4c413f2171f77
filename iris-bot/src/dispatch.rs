//! The dispatch core: resolves input to text, routes it to the right vision
//! operation, and assembles the dual-channel reply.

use crate::classify::{classify, Intent};
use crate::event::{DispatchOutcome, DualResponse, EventKind, InboundEvent, SpeechClip};
use crate::media;
use crate::session::SessionStore;
use crate::stt::{TranscribeError, Transcriber};
use crate::tts::{SpeechSynthesizer, SynthesisOptions};
use crate::vision::VisionInference;
use std::sync::Arc;

/// Acknowledgment after a stored image upload.
pub const MSG_IMAGE_STORED: &str =
    "Got the image! Now ask a question or request a description.";
/// Reply when image bytes cannot be decoded.
pub const MSG_IMAGE_REJECTED: &str = "Couldn't process the image. Try again.";
/// Reply when a voice note cannot be turned into text.
pub const MSG_VOICE_REJECTED: &str = "I couldn't understand your voice message.";
/// Reply when no image has been uploaded yet.
pub const MSG_NO_SESSION_IMAGE: &str = "Please send me an image first.";
/// Reply when vision inference fails.
pub const MSG_INFERENCE_FAILED: &str = "Couldn't generate a response.";

/// Orchestrates one inbound event end to end.
///
/// Holds only `Arc` handles; cheap to clone into per-event tasks. No lock is
/// held across any collaborator call; session access is confined to the
/// `get`/`put` operations themselves.
#[derive(Clone)]
pub struct Dispatcher {
    sessions: SessionStore,
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    vision: Arc<dyn VisionInference>,
    synthesis: SynthesisOptions,
}

impl Dispatcher {
    pub fn new(
        sessions: SessionStore,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        vision: Arc<dyn VisionInference>,
        synthesis: SynthesisOptions,
    ) -> Self {
        Self {
            sessions,
            transcriber,
            synthesizer,
            vision,
            synthesis,
        }
    }

    /// Dispatch one event to its terminal outcome.
    ///
    /// Every recoverable failure maps to exactly one user-visible message;
    /// nothing here retries, and nothing here mutates the session store on a
    /// failed path.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchOutcome {
        let user_id = event.user_id;

        // Resolve the event to input text, or terminate early.
        let text = match event.kind {
            EventKind::Image(bytes) => {
                return match media::decode_image(&bytes) {
                    Ok(image) => {
                        self.sessions.put(user_id, image).await;
                        tracing::info!(user_id, "Session image stored");
                        DispatchOutcome::ImageStored(MSG_IMAGE_STORED.to_string())
                    }
                    Err(e) => {
                        tracing::warn!(user_id, error = %e, "Image upload rejected");
                        DispatchOutcome::Rejected(MSG_IMAGE_REJECTED.to_string())
                    }
                };
            }
            EventKind::Text(text) => text,
            EventKind::Voice(bytes) => match self.resolve_voice(user_id, &bytes).await {
                Some(text) => text,
                None => return DispatchOutcome::Rejected(MSG_VOICE_REJECTED.to_string()),
            },
        };

        // A vision query needs a session image. The question is dropped if
        // there is none; pending questions are never buffered.
        let Some(image) = self.sessions.get(user_id).await else {
            tracing::info!(user_id, "Query without a session image");
            return DispatchOutcome::Rejected(MSG_NO_SESSION_IMAGE.to_string());
        };

        // Classify and invoke the matching vision operation on the snapshot
        // taken above.
        let text = text.trim();
        let (result, label) = match classify(text) {
            Intent::Question => (self.vision.answer(&image, text).await, "Answer"),
            Intent::DescriptionRequest => (self.vision.caption(&image).await, "Description"),
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Vision inference failed");
                return DispatchOutcome::Rejected(MSG_INFERENCE_FAILED.to_string());
            }
        };

        // Synthesize the voice rendering of the bare reply. A synthesis
        // failure must not block the text channel.
        let speech = match self.synthesizer.synthesize(&reply, &self.synthesis).await {
            Ok(data) => Some(SpeechClip {
                data,
                format: self.synthesis.format.extension().to_string(),
            }),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Speech synthesis failed, replying text-only");
                None
            }
        };

        DispatchOutcome::Reply(DualResponse {
            text: format!("{label}: {reply}"),
            speech,
        })
    }

    /// Voice resolution: transcode then transcribe, single attempt.
    ///
    /// All three failure classes (undecodable container, unintelligible
    /// audio, transcription service error) collapse into the same
    /// user-visible outcome; only the logs tell them apart.
    async fn resolve_voice(&self, user_id: i64, bytes: &[u8]) -> Option<String> {
        let waveform = match media::transcode_voice(bytes) {
            Ok(waveform) => waveform,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Voice transcode failed");
                return None;
            }
        };

        match self.transcriber.transcribe(&waveform).await {
            Ok(text) => Some(text),
            Err(TranscribeError::Unintelligible) => {
                tracing::warn!(user_id, "Voice note unintelligible");
                None
            }
            Err(TranscribeError::Service(msg)) => {
                tracing::error!(user_id, error = %msg, "Transcription service failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{SessionImage, Waveform};
    use crate::tts::SynthesisError;
    use crate::vision::InferenceError;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockVision {
        caption_calls: AtomicUsize,
        answer_calls: AtomicUsize,
        questions: Mutex<Vec<String>>,
        seen_dimensions: Mutex<Vec<(u32, u32)>>,
        fail: bool,
    }

    impl MockVision {
        fn new() -> Self {
            Self {
                caption_calls: AtomicUsize::new(0),
                answer_calls: AtomicUsize::new(0),
                questions: Mutex::new(Vec::new()),
                seen_dimensions: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl VisionInference for MockVision {
        async fn caption(&self, image: &SessionImage) -> Result<String, InferenceError> {
            self.caption_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_dimensions.lock().unwrap().push(image.dimensions());
            if self.fail {
                return Err(InferenceError("model offline".into()));
            }
            Ok("a red car parked outside".to_string())
        }

        async fn answer(
            &self,
            image: &SessionImage,
            question: &str,
        ) -> Result<String, InferenceError> {
            self.answer_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_dimensions.lock().unwrap().push(image.dimensions());
            self.questions.lock().unwrap().push(question.to_string());
            if self.fail {
                return Err(InferenceError("model offline".into()));
            }
            Ok("red".to_string())
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    enum MockTranscription {
        Text(&'static str),
        Unintelligible,
        ServiceError,
    }

    struct MockTranscriber {
        calls: AtomicUsize,
        result: MockTranscription,
    }

    impl MockTranscriber {
        fn returning(result: MockTranscription) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                result,
            }
        }
    }

    #[async_trait]
    impl Transcriber for MockTranscriber {
        async fn transcribe(&self, _waveform: &Waveform) -> Result<String, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                MockTranscription::Text(text) => Ok((*text).to_string()),
                MockTranscription::Unintelligible => Err(TranscribeError::Unintelligible),
                MockTranscription::ServiceError => {
                    Err(TranscribeError::Service("api down".into()))
                }
            }
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    struct MockSynthesizer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockSynthesizer {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for MockSynthesizer {
        async fn synthesize(
            &self,
            _text: &str,
            _options: &SynthesisOptions,
        ) -> Result<Vec<u8>, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SynthesisError("tts offline".into()));
            }
            Ok(vec![0x4f, 0x67, 0x67, 0x53])
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        sessions: SessionStore,
        vision: Arc<MockVision>,
        transcriber: Arc<MockTranscriber>,
        synthesizer: Arc<MockSynthesizer>,
    }

    fn harness_with(
        vision: MockVision,
        transcriber: MockTranscriber,
        synthesizer: MockSynthesizer,
    ) -> Harness {
        let sessions = SessionStore::new();
        let vision = Arc::new(vision);
        let transcriber = Arc::new(transcriber);
        let synthesizer = Arc::new(synthesizer);
        let dispatcher = Dispatcher::new(
            sessions.clone(),
            transcriber.clone(),
            synthesizer.clone(),
            vision.clone(),
            SynthesisOptions::default(),
        );
        Harness {
            dispatcher,
            sessions,
            vision,
            transcriber,
            synthesizer,
        }
    }

    fn harness() -> Harness {
        harness_with(
            MockVision::new(),
            MockTranscriber::returning(MockTranscription::Text("what color is the car?")),
            MockSynthesizer::new(false),
        )
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn wav_voice_bytes() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..1600i16 {
                writer.write_sample(i % 128).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    async fn upload(h: &Harness, user_id: i64, width: u32, height: u32) {
        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(
                user_id,
                user_id,
                EventKind::Image(png_bytes(width, height)),
            ))
            .await;
        assert!(matches!(outcome, DispatchOutcome::ImageStored(_)));
    }

    #[tokio::test]
    async fn image_upload_is_acknowledged_and_stored() {
        let h = harness();
        upload(&h, 7, 2, 2).await;

        assert!(h.sessions.get(7).await.is_some());
        assert_eq!(h.vision.caption_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.vision.answer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_image_is_rejected_without_session_mutation() {
        let h = harness();
        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Image(b"not an image".to_vec())))
            .await;

        match outcome {
            DispatchOutcome::Rejected(msg) => assert_eq!(msg, MSG_IMAGE_REJECTED),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(h.sessions.get(7).await.is_none());
    }

    #[tokio::test]
    async fn question_routes_to_answer_with_dual_reply() {
        let h = harness();
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(
                7,
                7,
                EventKind::Text("What color is the car?".into()),
            ))
            .await;

        let reply = match outcome {
            DispatchOutcome::Reply(reply) => reply,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(reply.text, "Answer: red");
        assert!(reply.speech.is_some());
        assert_eq!(h.vision.answer_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.vision.caption_calls.load(Ordering::SeqCst), 0);
        let questions = h.vision.questions.lock().unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0], "What color is the car?");
        assert_eq!(h.synthesizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn description_request_routes_to_caption() {
        let h = harness();
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Text("describe this".into())))
            .await;

        let reply = match outcome {
            DispatchOutcome::Reply(reply) => reply,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(reply.text, "Description: a red car parked outside");
        assert_eq!(h.vision.caption_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.vision.answer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn query_without_image_never_reaches_vision() {
        let h = harness();
        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Text("what is this?".into())))
            .await;

        match outcome {
            DispatchOutcome::Rejected(msg) => assert_eq!(msg, MSG_NO_SESSION_IMAGE),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.vision.answer_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.vision.caption_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_upload_replaces_first_for_inference() {
        let h = harness();
        upload(&h, 7, 2, 2).await;
        upload(&h, 7, 6, 4).await;

        h.dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Text("what is it?".into())))
            .await;

        let seen = h.vision.seen_dimensions.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (6, 4));
    }

    #[tokio::test]
    async fn voice_question_is_transcribed_and_answered() {
        let h = harness();
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Voice(wav_voice_bytes())))
            .await;

        assert!(matches!(outcome, DispatchOutcome::Reply(_)));
        assert_eq!(h.transcriber.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.vision.answer_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unintelligible_voice_short_circuits() {
        let h = harness_with(
            MockVision::new(),
            MockTranscriber::returning(MockTranscription::Unintelligible),
            MockSynthesizer::new(false),
        );
        upload(&h, 7, 2, 2).await;
        let stored_before = h.sessions.len().await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Voice(wav_voice_bytes())))
            .await;

        match outcome {
            DispatchOutcome::Rejected(msg) => assert_eq!(msg, MSG_VOICE_REJECTED),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.vision.answer_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.vision.caption_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.sessions.len().await, stored_before);
    }

    #[tokio::test]
    async fn transcription_service_failure_short_circuits() {
        let h = harness_with(
            MockVision::new(),
            MockTranscriber::returning(MockTranscription::ServiceError),
            MockSynthesizer::new(false),
        );
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Voice(wav_voice_bytes())))
            .await;

        assert!(matches!(outcome, DispatchOutcome::Rejected(_)));
        assert_eq!(h.vision.answer_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_voice_never_reaches_transcriber() {
        let h = harness();
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Voice(b"static noise".to_vec())))
            .await;

        match outcome {
            DispatchOutcome::Rejected(msg) => assert_eq!(msg, MSG_VOICE_REJECTED),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.transcriber.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inference_failure_withholds_both_channels() {
        let h = harness_with(
            MockVision::failing(),
            MockTranscriber::returning(MockTranscription::Text("hi")),
            MockSynthesizer::new(false),
        );
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Text("what is this?".into())))
            .await;

        match outcome {
            DispatchOutcome::Rejected(msg) => assert_eq!(msg, MSG_INFERENCE_FAILED),
            other => panic!("unexpected outcome: {other:?}"),
        }
        // Synthesis is downstream of inference; it must never run.
        assert_eq!(h.synthesizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_still_produces_text_reply() {
        let h = harness_with(
            MockVision::new(),
            MockTranscriber::returning(MockTranscription::Text("hi")),
            MockSynthesizer::new(true),
        );
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Text("what is this?".into())))
            .await;

        let reply = match outcome {
            DispatchOutcome::Reply(reply) => reply,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(reply.text, "Answer: red");
        assert!(reply.speech.is_none());
        assert_eq!(h.synthesizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_text_is_treated_as_description_request() {
        let h = harness();
        upload(&h, 7, 2, 2).await;

        let outcome = h
            .dispatcher
            .dispatch(InboundEvent::new(7, 7, EventKind::Text("   ".into())))
            .await;

        assert!(matches!(outcome, DispatchOutcome::Reply(_)));
        assert_eq!(h.vision.caption_calls.load(Ordering::SeqCst), 1);
    }
}

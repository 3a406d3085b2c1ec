use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use cinegen::{
    studio::{KEY_DIALOG_FAILED, NO_KEY_SELECTED, SESSION_EXPIRED},
    AspectRatio, GenAIError, GenerationRequest, ImageGenerator, ImageSize, KeySelector, ModelTier,
    ReferenceImage, Result, Studio, StudioConfig,
};

#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn replying(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        })
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenAIError::NoImageProduced))
    }
}

#[derive(Clone, Copy)]
enum DialogOutcome {
    Grant,
    Dismissed,
    Fail,
}

struct FakeSelector {
    has_key: AtomicBool,
    outcome: DialogOutcome,
    opened: AtomicUsize,
}

impl FakeSelector {
    fn new(has_key: bool, outcome: DialogOutcome) -> Arc<Self> {
        Arc::new(Self {
            has_key: AtomicBool::new(has_key),
            outcome,
            opened: AtomicUsize::new(0),
        })
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySelector for FakeSelector {
    async fn has_selected_key(&self) -> bool {
        self.has_key.load(Ordering::SeqCst)
    }

    async fn open_key_selector(&self) -> Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            DialogOutcome::Grant => {
                self.has_key.store(true, Ordering::SeqCst);
                Ok(())
            }
            DialogOutcome::Dismissed => Ok(()),
            DialogOutcome::Fail => Err(GenAIError::KeySelection("dialog unavailable".into())),
        }
    }
}

fn studio(
    generator: Arc<dyn ImageGenerator>,
    selector: Arc<dyn KeySelector>,
    model: ModelTier,
) -> Studio {
    let config = StudioConfig::new()
        .with_model(model)
        .with_prompt("a cinematic portrait");
    Studio::new(generator, selector, config)
}

#[tokio::test]
async fn flash_generation_skips_key_gate_and_records_history() {
    let generator = ScriptedGenerator::replying(vec![Ok("data:image/png;base64,QQ==".into())]);
    let selector = FakeSelector::new(false, DialogOutcome::Fail);
    let studio = studio(generator.clone(), selector.clone(), ModelTier::Flash);

    let result = studio.generate().await.unwrap();

    assert_eq!(result.image_url, "data:image/png;base64,QQ==");
    assert_eq!(result.model, "gemini-2.5-flash-image");
    assert_eq!(result.prompt, "a cinematic portrait");
    assert_eq!(selector.opened(), 0);
    assert_eq!(studio.history().len(), 1);
    assert!(studio.last_error().is_none());
    assert!(!studio.is_generating());

    let requests = generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].config.aspect_ratio, AspectRatio::Wide);
}

#[tokio::test]
async fn pro_without_key_opens_selector_then_generates() {
    let generator = ScriptedGenerator::replying(vec![Ok("data:image/png;base64,QQ==".into())]);
    let selector = FakeSelector::new(false, DialogOutcome::Grant);
    let studio = studio(generator.clone(), selector.clone(), ModelTier::Pro);
    studio.set_image_size(ImageSize::FourK);
    studio.set_aspect_ratio(AspectRatio::Tall);

    studio.generate().await.unwrap();

    assert_eq!(selector.opened(), 1);
    let requests = generator.requests();
    assert_eq!(requests[0].model, ModelTier::Pro);
    assert_eq!(requests[0].config.image_size, Some(ImageSize::FourK));
    assert_eq!(requests[0].config.aspect_ratio, AspectRatio::Tall);
}

#[tokio::test]
async fn failed_key_dialog_stops_before_generation() {
    let generator = ScriptedGenerator::replying(vec![]);
    let selector = FakeSelector::new(false, DialogOutcome::Fail);
    let studio = studio(generator.clone(), selector.clone(), ModelTier::Pro);

    let err = studio.generate().await.unwrap_err();

    assert!(matches!(err, GenAIError::KeySelection(_)));
    assert_eq!(studio.last_error().as_deref(), Some(KEY_DIALOG_FAILED));
    assert!(generator.requests().is_empty());
    assert!(!studio.is_generating());
}

#[tokio::test]
async fn dismissed_key_dialog_is_rechecked() {
    let generator = ScriptedGenerator::replying(vec![]);
    let selector = FakeSelector::new(false, DialogOutcome::Dismissed);
    let studio = studio(generator.clone(), selector.clone(), ModelTier::Pro);

    let err = studio.generate().await.unwrap_err();

    assert!(err.is_authentication_needed());
    assert_eq!(studio.last_error().as_deref(), Some(NO_KEY_SELECTED));
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn expired_key_prompts_reselection_for_pro() {
    let generator = ScriptedGenerator::replying(vec![Err(GenAIError::AuthenticationNeeded)]);
    let selector = FakeSelector::new(true, DialogOutcome::Grant);
    let studio = studio(generator.clone(), selector.clone(), ModelTier::Pro);

    let err = studio.generate().await.unwrap_err();

    assert!(err.is_authentication_needed());
    assert_eq!(studio.last_error().as_deref(), Some(SESSION_EXPIRED));
    assert_eq!(selector.opened(), 1);
    assert!(studio.history().is_empty());
}

#[tokio::test]
async fn expired_key_on_flash_only_reports() {
    let generator = ScriptedGenerator::replying(vec![Err(GenAIError::AuthenticationNeeded)]);
    let selector = FakeSelector::new(true, DialogOutcome::Grant);
    let studio = studio(generator, selector.clone(), ModelTier::Flash);

    studio.generate().await.unwrap_err();

    assert_eq!(studio.last_error().as_deref(), Some(SESSION_EXPIRED));
    assert_eq!(selector.opened(), 0);
}

#[tokio::test]
async fn generic_failure_surfaces_its_message_and_clears_on_retry() {
    let generator = ScriptedGenerator::replying(vec![
        Err(GenAIError::Upstream {
            status: 500,
            message: "Internal error encountered.".into(),
        }),
        Ok("data:image/png;base64,QQ==".into()),
    ]);
    let studio = studio(
        generator,
        FakeSelector::new(true, DialogOutcome::Grant),
        ModelTier::Flash,
    );

    studio.generate().await.unwrap_err();
    assert_eq!(studio.last_error().as_deref(), Some("Internal error encountered."));

    studio.generate().await.unwrap();
    assert!(studio.last_error().is_none());
}

#[tokio::test]
async fn transport_failure_message_is_shown_as_is() {
    let generator = ScriptedGenerator::replying(vec![Err(GenAIError::Transport(
        "operation timed out".into(),
    ))]);
    let studio = studio(
        generator,
        FakeSelector::new(true, DialogOutcome::Grant),
        ModelTier::Flash,
    );

    studio.generate().await.unwrap_err();
    assert_eq!(studio.last_error().as_deref(), Some("operation timed out"));
}

#[tokio::test]
async fn reference_image_is_forwarded_without_prefix() {
    let generator = ScriptedGenerator::replying(vec![Ok("data:image/png;base64,QQ==".into())]);
    let studio = studio(
        generator.clone(),
        FakeSelector::new(true, DialogOutcome::Grant),
        ModelTier::Flash,
    );
    studio.set_reference_image(ReferenceImage::from_base64("data:image/png;base64,iVBOR"));

    studio.generate().await.unwrap();

    let reference = generator.requests()[0].reference_image.clone().unwrap();
    assert_eq!(reference.data, "iVBOR");
    assert_eq!(reference.mime_type, "image/png");
}

struct GatedGenerator {
    gate: Arc<Notify>,
}

#[async_trait]
impl ImageGenerator for GatedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        self.gate.notified().await;
        Ok("data:image/png;base64,QQ==".into())
    }
}

#[tokio::test]
async fn second_submission_is_rejected_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let studio = studio(
        Arc::new(GatedGenerator { gate: gate.clone() }),
        FakeSelector::new(true, DialogOutcome::Grant),
        ModelTier::Flash,
    );

    let first = studio.generate();
    let second = async {
        while !studio.is_generating() {
            tokio::task::yield_now().await;
        }
        let outcome = studio.generate().await;
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(GenAIError::GenerationInProgress)));
    assert!(!studio.is_generating());
    assert_eq!(studio.history().len(), 1);
}

#[tokio::test]
async fn selecting_history_moves_entry_to_front_and_saves_it() {
    let generator = ScriptedGenerator::replying(vec![
        Ok("data:image/png;base64,Zmlyc3Q=".into()),
        Ok("data:image/png;base64,c2Vjb25k".into()),
        Ok("data:image/png;base64,dGhpcmQ=".into()),
    ]);
    let studio = studio(
        generator,
        FakeSelector::new(true, DialogOutcome::Grant),
        ModelTier::Flash,
    );
    for _ in 0..3 {
        studio.generate().await.unwrap();
    }
    let before: Vec<String> = studio.history().into_iter().map(|r| r.image_url).collect();

    let selected = studio.select_history(2).unwrap();
    assert_eq!(selected.image_url, before[2]);

    let after: Vec<String> = studio.history().into_iter().map(|r| r.image_url).collect();
    assert_eq!(after, vec![before[2].clone(), before[0].clone(), before[1].clone()]);
    assert!(studio.select_history(3).is_err());

    let dir = tempfile::tempdir().unwrap();
    let path = studio.save_current_to(dir.path()).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"first");
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("cinematic-gen-") && name.ends_with(".png"));
}

#[tokio::test]
async fn saving_with_empty_history_fails() {
    let studio = studio(
        ScriptedGenerator::replying(vec![]),
        FakeSelector::new(true, DialogOutcome::Grant),
        ModelTier::Flash,
    );
    let dir = tempfile::tempdir().unwrap();
    assert!(studio.save_current_to(dir.path()).is_err());
}

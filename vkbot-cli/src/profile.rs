//! Profile questionnaire: `/start` → "Start Profile Creation" → name → age → gender → interests.
//!
//! Two routers: `profile` collects the answers, `profile-summary` (included second) prints the
//! result and clears the conversation. The summary step declares `user_id`, which
//! [`middleware::UserTrackingMiddleware`] puts into the context.

use async_trait::async_trait;
use fsm::{FsmContext, StateGroup};
use router::{Handler, HandlerEntry, Params, Router, TextFilter};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;
use vkbot_core::{Event, HandlerError, RequestContext, Result};
use vkbot_vk::VkClient;

pub const WAITING_NAME: &str = "waiting_name";
pub const WAITING_AGE: &str = "waiting_age";
pub const WAITING_GENDER: &str = "waiting_gender";
pub const WAITING_INTERESTS: &str = "waiting_interests";

const START_BUTTON: &str = "Start Profile Creation";
const GENDERS: [&str; 2] = ["Male", "Female"];

/// Outbound text channel used by the handlers.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, peer_id: i64, text: &str) -> Result<()>;
}

#[async_trait]
impl MessageSender for VkClient {
    async fn send_message(&self, peer_id: i64, text: &str) -> Result<()> {
        VkClient::send_message(self, peer_id, text).await.map(|_| ())
    }
}

pub fn profile_states() -> StateGroup {
    StateGroup::new("ProfileStates")
        .state(WAITING_NAME)
        .state(WAITING_AGE)
        .state(WAITING_GENDER)
        .state(WAITING_INTERESTS)
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Welcome,
    Begin,
    Name,
    Age,
    Gender,
    Interests,
}

struct ProfileStep {
    step: Step,
    states: StateGroup,
    sender: Arc<dyn MessageSender>,
}

impl ProfileStep {
    fn entry(step: Step, states: &StateGroup, sender: &Arc<dyn MessageSender>) -> HandlerEntry {
        HandlerEntry::message(Arc::new(Self {
            step,
            states: states.clone(),
            sender: sender.clone(),
        }))
    }

    async fn advance(&self, fsm: &FsmContext, key: &str, value: Value, next: &str) -> Result<()> {
        let mut partial = Map::new();
        partial.insert(key.to_string(), value);
        fsm.update_data(partial).await?;
        fsm.set_state(self.states.get(next)).await
    }
}

fn text_of(data: &Map<String, Value>, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl Handler for ProfileStep {
    async fn handle(
        &self,
        event: &Event,
        _context: &mut RequestContext,
        fsm: Option<&FsmContext>,
        params: Params,
    ) -> Result<()> {
        let (Some(peer_id), Some(fsm)) = (event.conversation_id(), fsm) else {
            return Ok(());
        };
        let text = event.text().unwrap_or_default();

        let reply = match self.step {
            Step::Welcome => {
                "Welcome to the Profile Bot! Send \"Start Profile Creation\" to begin.".to_string()
            }
            Step::Begin => {
                fsm.set_state(self.states.get(WAITING_NAME)).await?;
                "Let's create your profile! What's your name?".to_string()
            }
            Step::Name => {
                self.advance(fsm, "name", json!(text), WAITING_AGE).await?;
                format!("Nice to meet you, {}! How old are you?", text)
            }
            Step::Age => match text.parse::<u32>() {
                Ok(age) => {
                    self.advance(fsm, "age", json!(age), WAITING_GENDER).await?;
                    "Please select your gender: Male or Female".to_string()
                }
                Err(_) => "Please enter a valid age (numbers only)".to_string(),
            },
            Step::Gender => {
                if GENDERS.contains(&text) {
                    self.advance(fsm, "gender", json!(text), WAITING_INTERESTS)
                        .await?;
                    "Great! Finally, tell me about your interests and hobbies.".to_string()
                } else {
                    "Please answer Male or Female".to_string()
                }
            }
            Step::Interests => {
                let user_id = params
                    .get("user_id")
                    .ok_or_else(|| HandlerError::MissingField("user_id".to_string()))?;
                let data = fsm.get_data().await?;
                fsm.clear().await?;
                info!(peer_id, user_id = %user_id, "Profile completed");
                format!(
                    "Your profile is complete!\n\nName: {}\nAge: {}\nGender: {}\nInterests: {}\n\nUser ID: {}",
                    text_of(&data, "name"),
                    text_of(&data, "age"),
                    text_of(&data, "gender"),
                    text,
                    user_id
                )
            }
        };

        self.sender.send_message(peer_id, &reply).await
    }
}

/// Builds the questionnaire and summary routers, in inclusion order.
pub fn profile_routers(sender: Arc<dyn MessageSender>) -> (Router, Router) {
    let states = profile_states();

    let questionnaire = Router::new("profile")
        .register(ProfileStep::entry(Step::Welcome, &states, &sender).filter(TextFilter::new("/start")))
        .register(
            ProfileStep::entry(Step::Begin, &states, &sender)
                .filter(TextFilter::case_sensitive(START_BUTTON)),
        )
        .register(ProfileStep::entry(Step::Name, &states, &sender).state(states.get(WAITING_NAME)))
        .register(ProfileStep::entry(Step::Age, &states, &sender).state(states.get(WAITING_AGE)))
        .register(
            ProfileStep::entry(Step::Gender, &states, &sender).state(states.get(WAITING_GENDER)),
        );

    let summary = Router::new("profile-summary").register(
        ProfileStep::entry(Step::Interests, &states, &sender)
            .state(states.get(WAITING_INTERESTS))
            .inject(["user_id"]),
    );

    (questionnaire, summary)
}

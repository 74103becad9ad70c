//! Filters: predicates over (event, request context) that gate a handler entry.

use async_trait::async_trait;
use fsm::{IntoState, StateGroup};
use vkbot_core::{Event, RequestContext, Result};

/// A match condition. Implementations must be pure: no hidden state, no mutation of the context.
#[async_trait]
pub trait Filter: Send + Sync {
    async fn check(&self, event: &Event, context: &RequestContext) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StateTarget {
    Absent,
    Any,
    Exact(String),
    Group(StateGroup),
}

/// Matches on the state snapshot in the request context (`context.state()`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFilter {
    target: StateTarget,
}

impl StateFilter {
    /// Matches only when the conversation has no state.
    pub fn none() -> Self {
        Self {
            target: StateTarget::Absent,
        }
    }

    /// Matches when some state, whichever, is set.
    pub fn any() -> Self {
        Self {
            target: StateTarget::Any,
        }
    }

    /// Matches one exact state identity. `None` behaves like [`StateFilter::none`].
    pub fn state(state: impl IntoState) -> Self {
        let target = match state.into_state() {
            Some(id) => StateTarget::Exact(id),
            None => StateTarget::Absent,
        };
        Self { target }
    }

    /// Matches when the current state is any member of `group`.
    pub fn group(group: &StateGroup) -> Self {
        Self {
            target: StateTarget::Group(group.clone()),
        }
    }

    fn matches(&self, current: Option<&str>) -> bool {
        match (&self.target, current) {
            (StateTarget::Absent, current) => current.is_none(),
            (StateTarget::Any, current) => current.is_some(),
            (StateTarget::Exact(id), Some(current)) => id == current,
            (StateTarget::Group(group), Some(current)) => group.contains(current),
            (_, None) => false,
        }
    }
}

#[async_trait]
impl Filter for StateFilter {
    async fn check(&self, _event: &Event, context: &RequestContext) -> Result<bool> {
        Ok(self.matches(context.state()))
    }
}

/// Exact text match on the message text. No substring matching, no trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    text: String,
    ignore_case: bool,
}

impl TextFilter {
    /// Case-insensitive match.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ignore_case: true,
        }
    }

    pub fn case_sensitive(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    fn matches(&self, message_text: &str) -> bool {
        if self.ignore_case {
            message_text.to_lowercase() == self.text.to_lowercase()
        } else {
            message_text == self.text
        }
    }
}

#[async_trait]
impl Filter for TextFilter {
    async fn check(&self, event: &Event, _context: &RequestContext) -> Result<bool> {
        match event.text() {
            Some(text) if !text.is_empty() => Ok(self.matches(text)),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vkbot_core::StateData;

    fn text_event(text: &str) -> Event {
        Event::from_raw(json!({
            "type": "message_new",
            "object": {"message": {"peer_id": 1, "text": text}}
        }))
    }

    fn context_with_state(state: Option<&str>) -> RequestContext {
        RequestContext::seeded(state.map(str::to_string), StateData::new())
    }

    #[tokio::test]
    async fn test_state_filter_none_matches_only_absent_state() {
        let filter = StateFilter::none();
        let event = text_event("x");
        assert!(filter.check(&event, &context_with_state(None)).await.unwrap());
        assert!(!filter
            .check(&event, &context_with_state(Some("Profile:waiting_name")))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_state_filter_exact_identity() {
        let mut profile = StateGroup::new("Profile");
        let waiting_name = profile.add("waiting_name");
        let filter = StateFilter::state(&waiting_name);
        let event = text_event("x");

        assert!(filter
            .check(&event, &context_with_state(Some("Profile:waiting_name")))
            .await
            .unwrap());
        assert!(!filter
            .check(&event, &context_with_state(Some("Profile:waiting_age")))
            .await
            .unwrap());
        assert!(!filter
            .check(&event, &context_with_state(Some("Other:waiting_name")))
            .await
            .unwrap());
        assert!(!filter.check(&event, &context_with_state(None)).await.unwrap());
    }

    #[tokio::test]
    async fn test_state_filter_group_matches_any_member() {
        let profile = StateGroup::new("Profile")
            .state("waiting_name")
            .state("waiting_age");
        let filter = StateFilter::group(&profile);
        let event = text_event("x");

        assert!(filter
            .check(&event, &context_with_state(Some("Profile:waiting_age")))
            .await
            .unwrap());
        assert!(!filter
            .check(&event, &context_with_state(Some("Profile:done")))
            .await
            .unwrap());
        assert!(!filter.check(&event, &context_with_state(None)).await.unwrap());
    }

    #[tokio::test]
    async fn test_state_filter_any() {
        let filter = StateFilter::any();
        let event = text_event("x");
        assert!(filter.check(&event, &context_with_state(Some("A:b"))).await.unwrap());
        assert!(!filter.check(&event, &context_with_state(None)).await.unwrap());
    }

    #[tokio::test]
    async fn test_text_filter_ignores_case_by_default() {
        let filter = TextFilter::new("/Start");
        let ctx = context_with_state(None);
        assert!(filter.check(&text_event("/start"), &ctx).await.unwrap());
        assert!(filter.check(&text_event("/START"), &ctx).await.unwrap());
        assert!(!filter.check(&text_event("/start now"), &ctx).await.unwrap());
        assert!(!filter.check(&text_event(" /start"), &ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_text_filter_case_sensitive() {
        let filter = TextFilter::case_sensitive("Male");
        let ctx = context_with_state(None);
        assert!(filter.check(&text_event("Male"), &ctx).await.unwrap());
        assert!(!filter.check(&text_event("male"), &ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_text_filter_rejects_missing_or_empty_text() {
        let filter = TextFilter::new("");
        let ctx = context_with_state(None);
        assert!(!filter.check(&text_event(""), &ctx).await.unwrap());
        let no_text = Event::from_raw(json!({"type": "group_join", "object": {"user_id": 1}}));
        assert!(!filter.check(&no_text, &ctx).await.unwrap());
    }
}

//! Ties a city field to a weather lookup and the two fields it fills.
//!
//! A trigger reads the city field, and if the value is long enough, spawns one
//! lookup and returns at once. When the lookup finishes, temperature and
//! humidity are written together, or the user is warned. Triggers are never
//! cancelled; see [`OrderingPolicy`] for how overlapping completions resolve.

use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{
    Config,
    form::{Alert, FormFields},
    model::{CityQuery, FormFieldBinding, WeatherResult},
    provider::{WeatherLookup, provider_from_config},
};

/// How completions of overlapping lookups are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingPolicy {
    /// Every completion is applied as it arrives. A slow earlier lookup may
    /// overwrite the result of a later one.
    #[default]
    Unordered,
    /// Only the most recently triggered lookup may write or warn.
    LatestWins,
}

/// Interaction on the city field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    /// The value was committed.
    Change,
    /// The field lost focus.
    Blur,
}

/// What a single trigger ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Filled(WeatherResult),
    Failed,
    /// A newer trigger was issued first; nothing was written or shown.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct AutofillBinder {
    binding: Arc<FormFieldBinding>,
    form: Arc<dyn FormFields>,
    lookup: Arc<dyn WeatherLookup>,
    alert: Arc<dyn Alert>,
    ordering: OrderingPolicy,
    latest: Arc<AtomicU64>,
}

impl AutofillBinder {
    /// Attach to a form. Call once, after the fields exist.
    pub fn bind(
        binding: FormFieldBinding,
        form: Arc<dyn FormFields>,
        lookup: Arc<dyn WeatherLookup>,
        alert: Arc<dyn Alert>,
    ) -> Self {
        debug!(city_field = %binding.city(), "autofill bound");

        Self {
            binding: Arc::new(binding),
            form,
            lookup,
            alert,
            ordering: OrderingPolicy::default(),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bind using the fields, provider and ordering from `config`.
    pub fn from_config(
        config: &Config,
        form: Arc<dyn FormFields>,
        alert: Arc<dyn Alert>,
    ) -> anyhow::Result<Self> {
        let lookup = provider_from_config(config)?;

        Ok(Self::bind(config.form.binding(), form, lookup, alert).with_ordering(config.ordering))
    }

    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn binding(&self) -> &FormFieldBinding {
        &self.binding
    }

    pub fn ordering(&self) -> OrderingPolicy {
        self.ordering
    }

    /// React to an interaction on the city field.
    ///
    /// Returns `None` without any request when the city has two characters or
    /// fewer. Otherwise one lookup is spawned on the current tokio runtime and
    /// its handle returned; the form is updated whether or not it is awaited.
    pub fn handle(&self, event: FieldEvent) -> Option<JoinHandle<TriggerOutcome>> {
        let city = CityQuery::new(self.form.value(self.binding.city()).unwrap_or_default());

        if !city.is_lookupable() {
            debug!(?event, len = city.len(), "city too short, no lookup");
            return None;
        }

        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(?event, %city, generation, "triggering weather lookup");

        let this = self.clone();
        Some(tokio::spawn(async move { this.complete(city, generation).await }))
    }

    async fn complete(self, city: CityQuery, generation: u64) -> TriggerOutcome {
        let result = self.lookup.lookup(&city).await;

        if self.is_stale(generation) {
            debug!(%city, generation, "newer lookup pending, dropping result");
            return TriggerOutcome::Superseded;
        }

        match result {
            Ok(weather) => {
                self.form.set_values(&[
                    (self.binding.temperature(), weather.temperature_text()),
                    (self.binding.humidity(), weather.humidity_text()),
                ]);
                TriggerOutcome::Filled(weather)
            }
            Err(err) => {
                self.alert.warn(err.user_message());
                TriggerOutcome::Failed
            }
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.ordering == OrderingPolicy::LatestWins
            && self.latest.load(Ordering::SeqCst) != generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{LOOKUP_FAILED_MESSAGE, LookupCause, LookupFailed},
        form::InMemoryForm,
        model::FieldId,
    };
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };
    use tokio::sync::oneshot;

    type Reply = Result<WeatherResult, LookupFailed>;

    /// Lookup whose replies are released by the test, per city, in any order.
    #[derive(Debug, Default)]
    struct ScriptedLookup {
        pending: Mutex<HashMap<String, VecDeque<oneshot::Receiver<Reply>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn script(&self, city: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().entry(city.to_string()).or_default().push_back(rx);
            tx
        }

        fn respond(&self, city: &str, reply: Reply) {
            let _ = self.script(city).send(reply);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherLookup for ScriptedLookup {
        async fn lookup(&self, city: &CityQuery) -> Result<WeatherResult, LookupFailed> {
            self.calls.lock().unwrap().push(city.to_string());
            let rx = self
                .pending
                .lock()
                .unwrap()
                .get_mut(city.as_str())
                .and_then(VecDeque::pop_front);

            match rx {
                Some(rx) => rx.await.unwrap_or_else(|_| Err(failure(city.as_str()))),
                None => Err(failure(city.as_str())),
            }
        }
    }

    #[derive(Debug, Default)]
    struct RecordingAlert {
        shown: Mutex<Vec<String>>,
    }

    impl RecordingAlert {
        fn shown(&self) -> Vec<String> {
            self.shown.lock().unwrap().clone()
        }
    }

    impl Alert for RecordingAlert {
        fn warn(&self, message: &str) {
            self.shown.lock().unwrap().push(message.to_string());
        }
    }

    fn weather(temperature: f64, humidity: f64) -> WeatherResult {
        WeatherResult {
            temperature,
            humidity,
            location: None,
            description: None,
            rainfall_mm: 0.0,
            observed_at: None,
        }
    }

    fn failure(city: &str) -> LookupFailed {
        LookupFailed::new(
            city,
            LookupCause::Status {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: "quota exceeded".into(),
            },
        )
    }

    struct Harness {
        form: Arc<InMemoryForm>,
        lookup: Arc<ScriptedLookup>,
        alert: Arc<RecordingAlert>,
        binder: AutofillBinder,
    }

    impl Harness {
        fn new(ordering: OrderingPolicy) -> Self {
            let form = Arc::new(InMemoryForm::new());
            let lookup = Arc::new(ScriptedLookup::default());
            let alert = Arc::new(RecordingAlert::default());
            let binder = AutofillBinder::bind(
                FormFieldBinding::default(),
                form.clone(),
                lookup.clone(),
                alert.clone(),
            )
            .with_ordering(ordering);

            Self { form, lookup, alert, binder }
        }

        fn type_city(&self, value: &str) {
            self.form.set_value(self.binder.binding().city(), value);
        }

        fn prefill(&self, temperature: &str, humidity: &str) {
            self.form.set_value(self.binder.binding().temperature(), temperature);
            self.form.set_value(self.binder.binding().humidity(), humidity);
        }

        fn pair(&self) -> (Option<String>, Option<String>) {
            let binding = self.binder.binding();
            (self.form.value(binding.temperature()), self.form.value(binding.humidity()))
        }

        async fn trigger(&self, event: FieldEvent) -> TriggerOutcome {
            self.binder
                .handle(event)
                .expect("lookup should be triggered")
                .await
                .expect("trigger task panicked")
        }
    }

    fn some_pair(temperature: &str, humidity: &str) -> (Option<String>, Option<String>) {
        (Some(temperature.to_string()), Some(humidity.to_string()))
    }

    #[tokio::test]
    async fn short_city_never_issues_a_request() {
        let h = Harness::new(OrderingPolicy::Unordered);
        h.prefill("old", "old");

        assert!(h.binder.handle(FieldEvent::Change).is_none(), "unset field");

        for value in ["", "a", "ab", "Łó"] {
            h.type_city(value);
            assert!(h.binder.handle(FieldEvent::Change).is_none(), "{value:?}");
            assert!(h.binder.handle(FieldEvent::Blur).is_none(), "{value:?}");
        }

        assert!(h.lookup.calls().is_empty());
        assert!(h.alert.shown().is_empty());
        assert_eq!(h.pair(), some_pair("old", "old"));
    }

    #[tokio::test]
    async fn successful_lookup_fills_both_fields() {
        let h = Harness::new(OrderingPolicy::Unordered);
        h.prefill("0", "0");
        h.type_city("Paris");
        h.lookup.respond("Paris", Ok(weather(21.5, 60.0)));

        let outcome = h.trigger(FieldEvent::Change).await;

        assert_eq!(outcome, TriggerOutcome::Filled(weather(21.5, 60.0)));
        assert_eq!(h.pair(), some_pair("21.5", "60"));
        assert_eq!(h.lookup.calls(), vec!["Paris"]);
        assert!(h.alert.shown().is_empty());
    }

    #[tokio::test]
    async fn failed_lookup_warns_once_and_leaves_fields() {
        let h = Harness::new(OrderingPolicy::Unordered);
        h.prefill("12", "34");
        h.type_city("Atlantis");
        h.lookup.respond("Atlantis", Err(failure("Atlantis")));

        let outcome = h.trigger(FieldEvent::Blur).await;

        assert_eq!(outcome, TriggerOutcome::Failed);
        assert_eq!(h.pair(), some_pair("12", "34"));
        assert_eq!(h.alert.shown(), vec![LOOKUP_FAILED_MESSAGE]);
    }

    #[tokio::test]
    async fn failed_lookup_does_not_create_missing_fields() {
        let h = Harness::new(OrderingPolicy::Unordered);
        h.type_city("Atlantis");

        assert_eq!(h.trigger(FieldEvent::Change).await, TriggerOutcome::Failed);
        assert_eq!(h.pair(), (None, None));
    }

    #[tokio::test]
    async fn each_event_issues_exactly_one_request() {
        let h = Harness::new(OrderingPolicy::Unordered);
        h.type_city("São Paulo");
        h.lookup.respond("São Paulo", Ok(weather(25.0, 70.0)));
        h.lookup.respond("São Paulo", Ok(weather(25.0, 70.0)));

        h.trigger(FieldEvent::Change).await;
        h.trigger(FieldEvent::Blur).await;

        assert_eq!(h.lookup.calls(), vec!["São Paulo", "São Paulo"]);
    }

    #[tokio::test]
    async fn retrigger_on_same_value_looks_up_again() {
        let h = Harness::new(OrderingPolicy::Unordered);
        h.type_city("Lyon");
        h.lookup.respond("Lyon", Ok(weather(10.0, 50.0)));
        h.trigger(FieldEvent::Change).await;

        h.lookup.respond("Lyon", Ok(weather(11.0, 49.0)));
        h.trigger(FieldEvent::Change).await;

        assert_eq!(h.lookup.calls().len(), 2);
        assert_eq!(h.pair(), some_pair("11", "49"));
    }

    #[tokio::test]
    async fn every_failure_warns_again() {
        let h = Harness::new(OrderingPolicy::Unordered);
        h.type_city("Atlantis");

        h.trigger(FieldEvent::Change).await;
        h.trigger(FieldEvent::Blur).await;

        assert_eq!(h.alert.shown().len(), 2);
    }

    #[tokio::test]
    async fn unordered_lets_a_slow_earlier_response_win() {
        let h = Harness::new(OrderingPolicy::Unordered);
        let paris = h.lookup.script("Paris");
        let berlin = h.lookup.script("Berlin");

        h.type_city("Paris");
        let first = h.binder.handle(FieldEvent::Change).expect("first trigger");
        h.type_city("Berlin");
        let second = h.binder.handle(FieldEvent::Change).expect("second trigger");

        berlin.send(Ok(weather(8.0, 81.0))).unwrap();
        assert_eq!(second.await.unwrap(), TriggerOutcome::Filled(weather(8.0, 81.0)));
        assert_eq!(h.pair(), some_pair("8", "81"));

        paris.send(Ok(weather(21.5, 60.0))).unwrap();
        assert_eq!(first.await.unwrap(), TriggerOutcome::Filled(weather(21.5, 60.0)));
        assert_eq!(h.pair(), some_pair("21.5", "60"));
    }

    #[tokio::test]
    async fn latest_wins_drops_a_slow_earlier_response() {
        let h = Harness::new(OrderingPolicy::LatestWins);
        let paris = h.lookup.script("Paris");
        let berlin = h.lookup.script("Berlin");

        h.type_city("Paris");
        let first = h.binder.handle(FieldEvent::Change).expect("first trigger");
        h.type_city("Berlin");
        let second = h.binder.handle(FieldEvent::Change).expect("second trigger");

        berlin.send(Ok(weather(8.0, 81.0))).unwrap();
        assert_eq!(second.await.unwrap(), TriggerOutcome::Filled(weather(8.0, 81.0)));

        paris.send(Ok(weather(21.5, 60.0))).unwrap();
        assert_eq!(first.await.unwrap(), TriggerOutcome::Superseded);

        assert_eq!(h.pair(), some_pair("8", "81"));
        assert_eq!(h.lookup.calls().len(), 2);
    }

    #[tokio::test]
    async fn latest_wins_silences_stale_failures_only() {
        let h = Harness::new(OrderingPolicy::LatestWins);
        h.prefill("1", "2");
        let paris = h.lookup.script("Paris");

        h.type_city("Paris");
        let first = h.binder.handle(FieldEvent::Change).expect("first trigger");
        h.type_city("Atlantis");
        let second = h.binder.handle(FieldEvent::Blur).expect("second trigger");

        assert_eq!(second.await.unwrap(), TriggerOutcome::Failed);
        paris.send(Err(failure("Paris"))).unwrap();
        assert_eq!(first.await.unwrap(), TriggerOutcome::Superseded);

        assert_eq!(h.alert.shown(), vec![LOOKUP_FAILED_MESSAGE]);
        assert_eq!(h.pair(), some_pair("1", "2"));
    }

    #[tokio::test]
    async fn custom_binding_writes_configured_fields() {
        let form = Arc::new(InMemoryForm::new());
        let lookup = Arc::new(ScriptedLookup::default());
        let binding = FormFieldBinding::new(
            FieldId::new("location"),
            FieldId::new("temp"),
            FieldId::new("hum"),
        );
        let binder = AutofillBinder::bind(
            binding,
            form.clone(),
            lookup.clone(),
            Arc::new(RecordingAlert::default()),
        );

        form.set_value(&FieldId::new("location"), "Ahmedabad");
        lookup.respond("Ahmedabad", Ok(weather(36.2, 22.0)));
        binder.handle(FieldEvent::Change).expect("trigger").await.unwrap();

        assert_eq!(form.value(&FieldId::new("temp")).as_deref(), Some("36.2"));
        assert_eq!(form.value(&FieldId::new("hum")).as_deref(), Some("22"));
        assert_eq!(form.value(&FieldId::new("id_temperature")), None);
    }

    #[tokio::test]
    async fn from_config_applies_binding_and_ordering() {
        let mut config = Config::default();
        config.set_api_key("KEY".into());
        config.ordering = OrderingPolicy::LatestWins;
        config.form.city_field = FieldId::new("id_location");

        let binder = AutofillBinder::from_config(
            &config,
            Arc::new(InMemoryForm::new()),
            Arc::new(RecordingAlert::default()),
        )
        .expect("binder");

        assert_eq!(binder.ordering(), OrderingPolicy::LatestWins);
        assert_eq!(binder.binding().city().as_str(), "id_location");
    }
}

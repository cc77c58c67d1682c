// 🐕 Dog Entity - identity + activity history
//
// The dog row stores only what the dog IS (name, birthdate, breed, ...).
// When it was last walked or fed is DERIVED from the walks / feedings
// history, so there is exactly one place that records an activity.

use crate::error::{Error, Result};
use crate::freshness::FreshnessPolicy;
use crate::temporal::{self, Age};
use chrono::NaiveDateTime;
use crossterm::style::Stylize;
use serde::{Deserialize, Serialize};

// ============================================================================
// DOG STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DogStatus {
    /// Fed and walked recently
    Content,
    Hungry,
    NeedsWalk,
    HungryAndNeedsWalk,
}

impl DogStatus {
    pub fn from_flags(hungry: bool, needs_walk: bool) -> Self {
        match (hungry, needs_walk) {
            (true, true) => DogStatus::HungryAndNeedsWalk,
            (true, false) => DogStatus::Hungry,
            (false, true) => DogStatus::NeedsWalk,
            (false, false) => DogStatus::Content,
        }
    }

    /// Parenthetical shown next to the name (empty when content)
    pub fn note(&self) -> &'static str {
        match self {
            DogStatus::Content => "",
            DogStatus::Hungry => "hungry",
            DogStatus::NeedsWalk => "needs a walk",
            DogStatus::HungryAndNeedsWalk => "hungry and in need of a walk!",
        }
    }

    pub fn is_content(&self) -> bool {
        *self == DogStatus::Content
    }
}

// ============================================================================
// NEW DOG (attributes before persistence)
// ============================================================================

/// Attributes for a dog that has not been stored yet
///
/// This is what the CLI collects and what a CSV import row deserializes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDog {
    pub name: String,
    pub birthdate: String,
    pub breed: String,
    pub image_url: String,
    #[serde(default)]
    pub favorite_treats: Vec<String>,
}

impl NewDog {
    pub fn new(name: &str, birthdate: &str, breed: &str, image_url: &str) -> Self {
        NewDog {
            name: name.to_string(),
            birthdate: birthdate.to_string(),
            breed: breed.to_string(),
            image_url: image_url.to_string(),
            favorite_treats: Vec::new(),
        }
    }

    /// Validate and parse into a transient `Dog` (no id yet)
    pub fn build(self) -> Result<Dog> {
        let dog = Dog::new(&self.name, &self.birthdate, &self.breed, &self.image_url)?;
        Ok(dog.with_treats(self.favorite_treats))
    }
}

// ============================================================================
// DOG ENTITY
// ============================================================================

/// Serialize only: ids and activity times come from the store, never from input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dog {
    /// Assigned by the store on first save, never changed afterwards
    id: Option<i64>,

    pub name: String,
    pub birthdate: NaiveDateTime,
    pub breed: String,
    pub image_url: String,
    pub favorite_treats: Vec<String>,

    // Derived from history, refreshed by the repository
    last_walked_at: Option<NaiveDateTime>,
    last_fed_at: Option<NaiveDateTime>,
}

impl Dog {
    /// Build a transient dog, e.g. for tests. Nothing is stored.
    pub fn new(name: &str, birthdate: &str, breed: &str, image_url: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name", "a dog needs a name"));
        }

        Ok(Dog {
            id: None,
            name: name.to_string(),
            birthdate: temporal::parse_date_input(birthdate)?,
            breed: breed.trim().to_string(),
            image_url: image_url.trim().to_string(),
            favorite_treats: Vec::new(),
            last_walked_at: None,
            last_fed_at: None,
        })
    }

    pub fn with_treats(mut self, treats: Vec<String>) -> Self {
        self.favorite_treats = treats;
        self
    }

    /// Rebuild a stored dog from its columns
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn hydrate(
        id: i64,
        name: String,
        birthdate: NaiveDateTime,
        breed: String,
        image_url: String,
        favorite_treats: Vec<String>,
        last_walked_at: Option<NaiveDateTime>,
        last_fed_at: Option<NaiveDateTime>,
    ) -> Self {
        Dog {
            id: Some(id),
            name,
            birthdate,
            breed,
            image_url,
            favorite_treats,
            last_walked_at,
            last_fed_at,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Only the repository assigns ids, and only once
    pub(crate) fn assign_id(&mut self, id: i64) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    pub fn last_walked_at(&self) -> Option<NaiveDateTime> {
        self.last_walked_at
    }

    pub fn last_fed_at(&self) -> Option<NaiveDateTime> {
        self.last_fed_at
    }

    /// History moves forward: an older activity never replaces a newer one
    pub(crate) fn observe_walk(&mut self, time: NaiveDateTime) {
        if self.last_walked_at.map_or(true, |last| time > last) {
            self.last_walked_at = Some(time);
        }
    }

    pub(crate) fn observe_feeding(&mut self, time: NaiveDateTime) {
        if self.last_fed_at.map_or(true, |last| time > last) {
            self.last_fed_at = Some(time);
        }
    }

    /// Replace the derived times with what the history table says
    pub(crate) fn refresh_history(
        &mut self,
        last_walked_at: Option<NaiveDateTime>,
        last_fed_at: Option<NaiveDateTime>,
    ) {
        self.last_walked_at = last_walked_at;
        self.last_fed_at = last_fed_at;
    }

    // ========================================================================
    // STATUS
    // ========================================================================

    pub fn needs_walk(&self, policy: &FreshnessPolicy, now: NaiveDateTime) -> bool {
        policy.walk_is_stale(self.last_walked_at, now)
    }

    pub fn is_hungry(&self, policy: &FreshnessPolicy, now: NaiveDateTime) -> bool {
        policy.feeding_is_stale(self.last_fed_at, now)
    }

    pub fn status(&self, policy: &FreshnessPolicy, now: NaiveDateTime) -> DogStatus {
        DogStatus::from_flags(self.is_hungry(policy, now), self.needs_walk(policy, now))
    }

    pub fn age(&self, now: NaiveDateTime) -> Age {
        Age::between(self.birthdate, now)
    }

    // ========================================================================
    // RENDERING
    // ========================================================================

    /// Name in green when content, red with the reason otherwise
    pub fn formatted_name(&self, policy: &FreshnessPolicy, now: NaiveDateTime) -> String {
        let status = self.status(policy, now);
        if status.is_content() {
            self.name.as_str().green().to_string()
        } else {
            format!("{} ({})", self.name, status.note()).red().to_string()
        }
    }

    pub fn render_summary(&self, policy: &FreshnessPolicy, now: NaiveDateTime) -> String {
        let mut lines = vec![
            self.formatted_name(policy, now),
            format!("  Age: {}", self.age(now)),
            format!("  Breed: {}", self.breed),
            format!("  Image Url: {}", self.image_url),
        ];

        if !self.favorite_treats.is_empty() {
            lines.push(format!("  Favorite treats: {}", self.favorite_treats.join(", ")));
        }

        lines.push(format!(
            "  Last walked at: {}",
            temporal::format_optional(self.last_walked_at)
        ));
        lines.push(format!(
            "  Last fed at: {}",
            temporal::format_optional(self.last_fed_at)
        ));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> NaiveDateTime {
        temporal::parse_timestamp("2022-04-08 12:00:00").unwrap()
    }

    fn lennon() -> Dog {
        Dog::new("Lennon", "2020-08-31", "Pomeranian", "https://example.com/lennon.jpg").unwrap()
    }

    #[test]
    fn test_new_dog_is_transient() {
        let dog = lennon();

        assert_eq!(dog.id(), None);
        assert!(!dog.is_persisted());
        assert_eq!(dog.name, "Lennon");
        assert_eq!(temporal::format_timestamp(dog.birthdate), "2020-08-31 00:00:00");
        assert_eq!(dog.last_walked_at(), None);
        assert_eq!(dog.last_fed_at(), None);
    }

    #[test]
    fn test_new_dog_validation() {
        let err = Dog::new("   ", "2020-08-31", "Pomeranian", "").unwrap_err();
        assert!(matches!(err, Error::Validation { field: "name", .. }));

        let err = Dog::new("Lennon", "last summer", "Pomeranian", "").unwrap_err();
        assert!(matches!(err, Error::Parse { what: "date", .. }));
    }

    #[test]
    fn test_id_is_assigned_once() {
        let mut dog = lennon();
        dog.assign_id(7);
        dog.assign_id(8);
        assert_eq!(dog.id(), Some(7));
    }

    #[test]
    fn test_age_scenarios() {
        let now = now();

        let mut dog = lennon();
        dog.birthdate = now - Duration::days(31);
        assert_eq!(dog.age(now).to_string(), "1 month");

        dog.birthdate = now - Duration::days(5);
        assert_eq!(dog.age(now).to_string(), "0 weeks");
    }

    #[test]
    fn test_never_fed_dog_is_hungry() {
        let policy = FreshnessPolicy::default();
        let now = now();
        let mut dog = lennon();

        assert!(dog.is_hungry(&policy, now));
        assert!(dog.needs_walk(&policy, now));

        dog.observe_feeding(now);
        assert!(!dog.is_hungry(&policy, now));

        let later = now + policy.feed_window + Duration::seconds(1);
        assert!(dog.is_hungry(&policy, later));
    }

    #[test]
    fn test_observe_keeps_latest() {
        let now = now();
        let mut dog = lennon();

        dog.observe_walk(now);
        dog.observe_walk(now - Duration::hours(3));
        assert_eq!(dog.last_walked_at(), Some(now));
    }

    #[test]
    fn test_status() {
        let policy = FreshnessPolicy::default();
        let now = now();
        let mut dog = lennon();

        assert_eq!(dog.status(&policy, now), DogStatus::HungryAndNeedsWalk);

        dog.observe_walk(now - Duration::hours(1));
        assert_eq!(dog.status(&policy, now), DogStatus::Hungry);

        dog.observe_feeding(now - Duration::hours(1));
        assert_eq!(dog.status(&policy, now), DogStatus::Content);

        let five_hours_later = now + Duration::hours(5);
        assert_eq!(dog.status(&policy, five_hours_later), DogStatus::NeedsWalk);
    }

    #[test]
    fn test_render_summary() {
        let policy = FreshnessPolicy::default();
        let now = now();
        let mut dog = lennon().with_treats(vec!["carrots".to_string(), "cheese".to_string()]);
        dog.observe_walk(temporal::parse_timestamp("2022-04-08 11:30:00").unwrap());

        let summary = dog.render_summary(&policy, now);

        assert!(summary.contains("Lennon (hungry)"));
        assert!(summary.contains("  Age: 1 year"));
        assert!(summary.contains("  Breed: Pomeranian"));
        assert!(summary.contains("  Image Url: https://example.com/lennon.jpg"));
        assert!(summary.contains("  Favorite treats: carrots, cheese"));
        assert!(summary.contains("  Last walked at: 2022-04-08 11:30:00"));
        assert!(summary.ends_with("  Last fed at: "));
    }

    #[test]
    fn test_formatted_name_notes() {
        let policy = FreshnessPolicy::default();
        let now = now();
        let mut dog = lennon();

        assert!(dog
            .formatted_name(&policy, now)
            .contains("Lennon (hungry and in need of a walk!)"));

        dog.observe_feeding(now);
        assert!(dog.formatted_name(&policy, now).contains("Lennon (needs a walk)"));

        dog.observe_walk(now);
        let name = dog.formatted_name(&policy, now);
        assert!(name.contains("Lennon"));
        assert!(!name.contains('('));
    }

    #[test]
    fn test_new_dog_build() {
        let mut attrs = NewDog::new("Olivia", "2018-03-31", "Terrier", "https://example.com/o.webp");
        attrs.favorite_treats = vec!["bacon".to_string()];

        let dog = attrs.build().unwrap();
        assert_eq!(dog.name, "Olivia");
        assert_eq!(dog.favorite_treats, vec!["bacon".to_string()]);
        assert!(!dog.is_persisted());
    }

    #[test]
    fn test_json_input_cannot_choose_id_or_history() {
        let json = r#"{
            "id": 99,
            "name": "Olivia",
            "birthdate": "2018-03-31",
            "breed": "Terrier",
            "image_url": "",
            "last_walked_at": "2022-04-08T12:00:00"
        }"#;

        let dog = serde_json::from_str::<NewDog>(json).unwrap().build().unwrap();
        assert_eq!(dog.id(), None);
        assert_eq!(dog.last_walked_at(), None);

        let mut stored = dog;
        stored.assign_id(7);
        let snapshot = serde_json::to_value(&stored).unwrap();
        assert_eq!(snapshot["id"], 7);
        assert!(snapshot["last_walked_at"].is_null());
    }
}

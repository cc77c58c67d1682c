// 🦮 Walk - one outing, any number of dogs (many-to-many via dog_walks)

use crate::temporal;
use chrono::NaiveDateTime;
use crossterm::style::Stylize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walk {
    pub id: i64,
    pub time: NaiveDateTime,

    /// Dogs that went on this walk, ascending by id
    pub dog_ids: Vec<i64>,
}

impl Walk {
    pub fn new(id: i64, time: NaiveDateTime, mut dog_ids: Vec<i64>) -> Self {
        dog_ids.sort_unstable();
        dog_ids.dedup();
        Walk { id, time, dog_ids }
    }

    pub fn formatted_time(&self) -> String {
        temporal::format_activity_time(self.time)
    }

    /// Day and time of the walk with every dog that went on it below
    pub fn render(&self, dog_names: &[String]) -> String {
        let mut lines = vec![self.formatted_time().green().to_string(), "Dogs: ".to_string()];
        lines.extend(dog_names.iter().map(|name| format!("  {}", name)));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(input: &str) -> NaiveDateTime {
        temporal::parse_timestamp(input).unwrap()
    }

    #[test]
    fn test_walk_dog_ids_are_sorted_and_unique() {
        let walk = Walk::new(1, at("2022-04-08 16:57:00"), vec![3, 1, 3, 2]);
        assert_eq!(walk.dog_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_walk_render() {
        let walk = Walk::new(1, at("2022-04-08 16:57:00"), vec![1, 2]);
        let rendered = walk.render(&["Lennon".to_string(), "Olivia".to_string()]);

        assert!(rendered.contains("Friday, 04/08  4:57 PM"));
        assert!(rendered.contains("Dogs: \n  Lennon\n  Olivia"));
    }
}

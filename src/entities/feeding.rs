// 🦴 Feeding - belongs to exactly one dog

use crate::temporal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feeding {
    pub id: i64,
    pub dog_id: i64,
    pub time: NaiveDateTime,
}

impl Feeding {
    pub fn formatted_time(&self) -> String {
        temporal::format_activity_time(self.time)
    }
}

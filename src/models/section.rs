use serde::{Deserialize, Serialize};

use crate::utils::value::deserialize_id;

/// A group of students as returned by `/sections/get-sections`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub usernames: Vec<Student>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Student {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Section {
    pub fn total_students(&self) -> usize {
        self.usernames.len()
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.usernames.iter().find(|s| s.id == id)
    }
}

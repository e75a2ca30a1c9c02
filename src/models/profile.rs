//! Tutor and student profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tutor profile attached to a user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tutor {
    pub id: i64,
    pub user_id: i64,
    pub subject: String,
    pub years_experience: i32,
    pub hourly_rate: f64,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a tutor profile
#[derive(Debug, Clone, Deserialize)]
pub struct TutorInput {
    pub user_id: i64,
    pub subject: String,
    pub years_experience: i32,
    pub hourly_rate: f64,
    pub location: String,
}

/// Partial update for a tutor profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTutorInput {
    pub subject: Option<String>,
    pub years_experience: Option<i32>,
    pub hourly_rate: Option<f64>,
    pub location: Option<String>,
}

impl Tutor {
    pub fn new(input: TutorInput) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id: input.user_id,
            subject: input.subject,
            years_experience: input.years_experience,
            hourly_rate: input.hourly_rate,
            location: input.location,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateTutorInput) {
        if let Some(subject) = update.subject {
            self.subject = subject;
        }
        if let Some(years) = update.years_experience {
            self.years_experience = years;
        }
        if let Some(rate) = update.hourly_rate {
            self.hourly_rate = rate;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        self.updated_at = Utc::now();
    }
}

/// Student profile attached to a user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub age: i32,
    /// Comma separated list of subjects
    pub subjects: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentInput {
    pub user_id: i64,
    pub age: i32,
    pub subjects: String,
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudentInput {
    pub age: Option<i32>,
    pub subjects: Option<String>,
    pub location: Option<String>,
}

impl Student {
    pub fn new(input: StudentInput) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id: input.user_id,
            age: input.age,
            subjects: input.subjects,
            location: input.location,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: UpdateStudentInput) {
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(subjects) = update.subjects {
            self.subjects = subjects;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        self.updated_at = Utc::now();
    }

    /// Subjects split on commas, trimmed, empties removed
    pub fn subject_list(&self) -> Vec<&str> {
        self.subjects
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

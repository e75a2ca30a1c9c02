//! Tutor and student profile service

use crate::db::repositories::{StudentRepository, TutorRepository};
use crate::db::StoreError;
use crate::models::{
    Student, StudentInput, Tutor, TutorInput, UpdateStudentInput, UpdateTutorInput,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ProfileService {
    tutors: Arc<dyn TutorRepository>,
    students: Arc<dyn StudentRepository>,
}

impl ProfileService {
    pub fn new(tutors: Arc<dyn TutorRepository>, students: Arc<dyn StudentRepository>) -> Self {
        Self { tutors, students }
    }

    pub async fn create_tutor(&self, input: TutorInput) -> Result<Tutor, ProfileServiceError> {
        let tutor = Tutor::new(input);
        validate_tutor(&tutor)?;
        self.tutors
            .create(&tutor)
            .await
            .map_err(|e| unknown_user(e, tutor.user_id))
    }

    pub async fn list_tutors(&self) -> Result<Vec<Tutor>, ProfileServiceError> {
        Ok(self.tutors.list().await?)
    }

    pub async fn get_tutor(&self, id: i64) -> Result<Tutor, ProfileServiceError> {
        self.tutors
            .get_by_id(id)
            .await?
            .ok_or(ProfileServiceError::NotFound("Tutor"))
    }

    pub async fn update_tutor(
        &self,
        id: i64,
        update: UpdateTutorInput,
    ) -> Result<Tutor, ProfileServiceError> {
        let mut tutor = self.get_tutor(id).await?;
        tutor.apply(update);
        validate_tutor(&tutor)?;
        Ok(self.tutors.update(&tutor).await?)
    }

    pub async fn delete_tutor(&self, id: i64) -> Result<(), ProfileServiceError> {
        if !self.tutors.delete(id).await? {
            return Err(ProfileServiceError::NotFound("Tutor"));
        }
        Ok(())
    }

    pub async fn create_student(
        &self,
        input: StudentInput,
    ) -> Result<Student, ProfileServiceError> {
        let student = Student::new(input);
        validate_student(&student)?;
        self.students
            .create(&student)
            .await
            .map_err(|e| unknown_user(e, student.user_id))
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, ProfileServiceError> {
        Ok(self.students.list().await?)
    }

    pub async fn get_student(&self, id: i64) -> Result<Student, ProfileServiceError> {
        self.students
            .get_by_id(id)
            .await?
            .ok_or(ProfileServiceError::NotFound("Student"))
    }

    pub async fn update_student(
        &self,
        id: i64,
        update: UpdateStudentInput,
    ) -> Result<Student, ProfileServiceError> {
        let mut student = self.get_student(id).await?;
        student.apply(update);
        validate_student(&student)?;
        Ok(self.students.update(&student).await?)
    }

    pub async fn delete_student(&self, id: i64) -> Result<(), ProfileServiceError> {
        if !self.students.delete(id).await? {
            return Err(ProfileServiceError::NotFound("Student"));
        }
        Ok(())
    }
}

fn unknown_user(err: StoreError, user_id: i64) -> ProfileServiceError {
    match err {
        StoreError::Constraint(_) => {
            ProfileServiceError::ValidationError(format!("User {} does not exist", user_id))
        }
        other => other.into(),
    }
}

fn validate_tutor(tutor: &Tutor) -> Result<(), ProfileServiceError> {
    if tutor.subject.trim().is_empty() {
        return Err(ProfileServiceError::ValidationError(
            "Subject cannot be empty".to_string(),
        ));
    }
    if tutor.years_experience < 0 {
        return Err(ProfileServiceError::ValidationError(
            "Years of experience cannot be negative".to_string(),
        ));
    }
    if !tutor.hourly_rate.is_finite() || tutor.hourly_rate < 0.0 {
        return Err(ProfileServiceError::ValidationError(
            "Hourly rate must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn validate_student(student: &Student) -> Result<(), ProfileServiceError> {
    if student.age <= 0 {
        return Err(ProfileServiceError::ValidationError(
            "Age must be positive".to_string(),
        ));
    }
    if student.subject_list().is_empty() {
        return Err(ProfileServiceError::ValidationError(
            "At least one subject is required".to_string(),
        ));
    }
    Ok(())
}

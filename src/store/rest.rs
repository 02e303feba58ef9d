//! REST client backend for the remote document store.
//!
//! Speaks JSON against the store service's collection paths:
//!
//! - `GET/PUT /teachers/{id}/schedules` (revisioned list)
//! - `GET    /subjects/{id}/schedules`
//! - `PUT/DELETE /subjects/{id}/schedules/{scheduleId}`
//! - `PUT    /sections/{id}/schedule`
//!
//! Compare-and-swap is carried in the write body as `expectedRevision`;
//! the service answers 409 when the document moved underneath us.

use super::types::{InstructorSchedules, Revision, ScheduleCopy};
use super::StoreError;
use crate::schedule::{InstructorId, Schedule, ScheduleId, SectionId, SubjectId};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub struct RestStore {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteSchedulesBody<'a> {
    schedules: &'a [Schedule],
    expected_revision: Option<&'a Revision>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteSchedulesResponse {
    revision: Revision,
}

impl RestStore {
    /// Creates a store client for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let mut base_url = Url::parse(base_url).map_err(|e| StoreError::Configuration {
            message: format!("invalid store base URL {base_url:?}: {e}"),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(path)
            .map_err(|e| StoreError::Configuration {
                message: format!("bad store path {path:?}: {e}"),
            })
    }
}

/// Classifies a non-success status from the store service.
fn status_error(status: StatusCode, context: &str) -> StoreError {
    if status.is_server_error() {
        StoreError::Unavailable {
            message: format!("{context} returned {status}"),
        }
    } else {
        StoreError::MalformedDocument {
            message: format!("{context} returned {status}"),
        }
    }
}

impl super::DocumentStore for RestStore {
    async fn instructor_schedules(
        &self,
        instructor: &InstructorId,
    ) -> Result<InstructorSchedules, StoreError> {
        let url = self.endpoint(&format!("teachers/{instructor}/schedules"))?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(InstructorSchedules::default()),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(status_error(status, "teachers read")),
        }
    }

    async fn write_instructor_schedules(
        &self,
        instructor: &InstructorId,
        schedules: &[Schedule],
        expected: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let url = self.endpoint(&format!("teachers/{instructor}/schedules"))?;
        let body = WriteSchedulesBody {
            schedules,
            expected_revision: expected,
        };
        let response = self.client.put(url).json(&body).send().await?;

        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::RevisionMismatch),
            status if status.is_success() => {
                let parsed: WriteSchedulesResponse = response.json().await?;
                Ok(parsed.revision)
            }
            status => Err(status_error(status, "teachers write")),
        }
    }

    async fn subject_schedule_copies(
        &self,
        subject: &SubjectId,
    ) -> Result<Vec<ScheduleCopy>, StoreError> {
        let url = self.endpoint(&format!("subjects/{subject}/schedules"))?;
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(status_error(status, "subjects read")),
        }
    }

    async fn upsert_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        copy: &ScheduleCopy,
    ) -> Result<(), StoreError> {
        let url =
            self.endpoint(&format!("subjects/{subject}/schedules/{}", copy.schedule_id()))?;
        let response = self.client.put(url).json(copy).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, "subjects upsert"))
        }
    }

    async fn remove_subject_schedule_copy(
        &self,
        subject: &SubjectId,
        schedule: &ScheduleId,
    ) -> Result<(), StoreError> {
        let url = self.endpoint(&format!("subjects/{subject}/schedules/{schedule}"))?;
        let response = self.client.delete(url).send().await?;

        let status = response.status();
        // A copy that is already gone is the outcome we wanted.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(status_error(status, "subjects remove"))
        }
    }

    async fn set_section_schedule(
        &self,
        section: &SectionId,
        copy: Option<&ScheduleCopy>,
    ) -> Result<(), StoreError> {
        let url = self.endpoint(&format!("sections/{section}/schedule"))?;
        let response = self.client.put(url).json(&copy).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, "sections write"))
        }
    }
}

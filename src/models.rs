use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = jobs)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub full_description: String,
    pub responsibilities: String,
    pub requirements: String,
    pub nice_to_have: Option<String>,
    pub pay_min: f64,
    pub pay_max: f64,
    pub pay_type: String,
    pub time_commitment: String,
    pub remote_worldwide: bool,
    pub allowed_countries: Vec<String>,
    pub skill_tags: Vec<String>,
    pub tools: Vec<String>,
    pub status: String,
    pub application_deadline: Option<NaiveDate>,
    pub published_at: Option<NaiveDateTime>,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub full_description: String,
    pub responsibilities: String,
    pub requirements: String,
    pub nice_to_have: Option<String>,
    pub pay_min: f64,
    pub pay_max: f64,
    pub pay_type: String,
    pub time_commitment: String,
    pub remote_worldwide: bool,
    pub allowed_countries: Vec<String>,
    pub skill_tags: Vec<String>,
    pub tools: Vec<String>,
    pub status: String,
    pub application_deadline: Option<NaiveDate>,
    pub published_at: Option<NaiveDateTime>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = applications)]
#[diesel(belongs_to(Job))]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub timezone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
    pub resume_url: Option<String>,
    pub why_interested: String,
    pub relevant_experience: String,
    pub expected_rate: Option<f64>,
    pub available_hours: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub source: String,
    pub status: String,
    pub ai_score: Option<i32>,
    pub ai_summary: Option<String>,
    pub ai_strengths: Option<Vec<String>>,
    pub ai_weaknesses: Option<Vec<String>>,
    pub ai_screened_at: Option<NaiveDateTime>,
    pub interview_score: Option<i32>,
    pub interview_status: Option<String>,
    pub interview_completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub timezone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
    pub resume_url: Option<String>,
    pub why_interested: String,
    pub relevant_experience: String,
    pub expected_rate: Option<f64>,
    pub available_hours: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub source: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = application_notes)]
#[diesel(belongs_to(Application))]
pub struct ApplicationNote {
    pub id: Uuid,
    pub application_id: Uuid,
    pub note_text: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = application_notes)]
pub struct NewApplicationNote {
    pub id: Uuid,
    pub application_id: Uuid,
    pub note_text: String,
    pub author_id: String,
    pub author_name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = contractors)]
pub struct Contractor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,
    pub timezone: Option<String>,
    pub hourly_rate: f64,
    pub weekly_cap: Option<f64>,
    pub skills: Vec<String>,
    pub bio: Option<String>,
    pub status: String,
    pub checkr_candidate_id: Option<String>,
    pub checkr_status: Option<String>,
    pub payment_eligible: bool,
    pub deel_contract_id: Option<String>,
    pub time_tracking_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Contractor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Payroll submission needs both a provider contract and the eligibility flag.
    pub fn is_payment_eligible(&self) -> bool {
        self.payment_eligible
            && self
                .deel_contract_id
                .as_deref()
                .is_some_and(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contractors)]
pub struct NewContractor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,
    pub timezone: Option<String>,
    pub hourly_rate: f64,
    pub weekly_cap: Option<f64>,
    pub skills: Vec<String>,
    pub bio: Option<String>,
    pub status: String,
    pub payment_eligible: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = contractor_notes)]
#[diesel(belongs_to(Contractor))]
pub struct ContractorNote {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub note_text: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contractor_notes)]
pub struct NewContractorNote {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub note_text: String,
    pub author_id: String,
    pub author_name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = project_assignments)]
#[diesel(belongs_to(Project))]
#[diesel(belongs_to(Contractor))]
pub struct ProjectAssignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub contractor_id: Uuid,
    pub role: Option<String>,
    pub hourly_rate: Option<f64>,
    pub weekly_cap: Option<f64>,
    pub status: String,
    pub assigned_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = project_assignments)]
pub struct NewProjectAssignment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub contractor_id: Uuid,
    pub role: Option<String>,
    pub hourly_rate: Option<f64>,
    pub weekly_cap: Option<f64>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = time_entries)]
#[diesel(belongs_to(Contractor))]
#[diesel(belongs_to(Project))]
pub struct TimeEntry {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub project_id: Uuid,
    pub work_date: NaiveDate,
    pub total_hours: f64,
    pub productive_hours: f64,
    pub notes: Option<String>,
    pub status: String,
    pub source: String,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = time_entries)]
pub struct NewTimeEntry {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub project_id: Uuid,
    pub work_date: NaiveDate,
    pub total_hours: f64,
    pub productive_hours: f64,
    pub notes: Option<String>,
    pub status: String,
    pub source: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = payments)]
#[diesel(belongs_to(Contractor))]
pub struct Payment {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_hours: f64,
    pub hourly_rate: f64,
    pub gross_amount: f64,
    pub net_amount: f64,
    pub status: String,
    pub external_payment_id: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub processed_at: Option<NaiveDateTime>,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_hours: f64,
    pub hourly_rate: f64,
    pub gross_amount: f64,
    pub net_amount: f64,
    pub status: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payment_time_entries)]
pub struct NewPaymentTimeEntry {
    pub payment_id: Uuid,
    pub time_entry_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = documents)]
#[diesel(belongs_to(Contractor))]
pub struct Document {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub doc_type: String,
    pub title: String,
    pub status: String,
    pub file_url: Option<String>,
    pub sent_at: Option<NaiveDateTime>,
    pub signed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub doc_type: String,
    pub title: String,
    pub status: String,
    pub file_url: Option<String>,
}

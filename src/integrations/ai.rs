//! Resume screening and interview support backed by a generative model.
//!
//! The mock produces scores from a generator seeded with the application id,
//! so repeated calls for the same application agree with each other.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{join_url, seeded_rng, send_json, IntegrationError};

const PROVIDER: &str = "ai provider";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ScreeningInput {
    pub application_id: Uuid,
    pub applicant_name: String,
    pub job_title: String,
    pub job_description: String,
    pub requirements: String,
    pub skill_tags: Vec<String>,
    pub resume_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    pub skill: String,
    pub matched: bool,
    pub confidence: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResult {
    pub overall_score: i32,
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendation: String,
    #[serde(default)]
    pub skill_matches: Vec<SkillMatch>,
}

#[derive(Debug, Clone)]
pub struct InterviewContext {
    pub application_id: Uuid,
    pub applicant_name: String,
    pub job_title: String,
    pub skill_tags: Vec<String>,
    pub responsibilities: String,
    pub requirements: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub question: String,
    pub time_limit: u32,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnswer {
    pub question_id: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    pub question_id: String,
    pub score: i32,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnalysis {
    pub overall_score: i32,
    pub communication_score: i32,
    pub technical_score: i32,
    pub culture_fit_score: i32,
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub recommendation: String,
    #[serde(default)]
    pub question_analysis: Vec<QuestionFeedback>,
}

#[async_trait]
pub trait AiProvider: Send + Sync + 'static {
    async fn screen_application(
        &self,
        input: &ScreeningInput,
    ) -> Result<ScreeningResult, IntegrationError>;

    async fn interview_questions(
        &self,
        context: &InterviewContext,
    ) -> Result<Vec<InterviewQuestion>, IntegrationError>;

    async fn analyze_interview(
        &self,
        context: &InterviewContext,
        answers: &[InterviewAnswer],
    ) -> Result<InterviewAnalysis, IntegrationError>;
}

pub struct AnthropicAi {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicAi {
    pub fn new(client: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String, IntegrationError> {
        #[derive(Deserialize)]
        struct MessageResponse {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            text: String,
        }

        let response: MessageResponse = send_json(
            PROVIDER,
            self.client
                .post(join_url(&self.base_url, "messages"))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": max_tokens,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
        )
        .await?;

        response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| IntegrationError::InvalidResponse {
                provider: PROVIDER,
                message: "no text content in model reply".to_string(),
            })
    }
}

/// Pulls the outermost `open`..`close` span out of free-form model output.
fn extract_json(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn parse_reply<T: DeserializeOwned>(text: &str, open: char, close: char) -> Result<T, IntegrationError> {
    let raw = extract_json(text, open, close).ok_or_else(|| IntegrationError::InvalidResponse {
        provider: PROVIDER,
        message: "model reply did not contain JSON".to_string(),
    })?;
    serde_json::from_str(raw).map_err(|err| IntegrationError::InvalidResponse {
        provider: PROVIDER,
        message: err.to_string(),
    })
}

#[async_trait]
impl AiProvider for AnthropicAi {
    async fn screen_application(
        &self,
        input: &ScreeningInput,
    ) -> Result<ScreeningResult, IntegrationError> {
        let prompt = format!(
            "Analyze this application for the {title} position.\n\n\
             Applicant: {name}\n\nApplication:\n{resume}\n\n\
             Job Description:\n{description}\n\nRequirements:\n{requirements}\n\n\
             Required Skills: {skills}\n\n\
             Reply with JSON only, in this format:\n\
             {{\"overallScore\": 0-100, \"summary\": \"2-3 sentences\", \
             \"strengths\": [\"...\"], \"weaknesses\": [\"...\"], \
             \"recommendation\": \"RECOMMEND|REVIEW|REJECT\", \
             \"skillMatches\": [{{\"skill\": \"...\", \"matched\": true, \"confidence\": 0-100}}]}}",
            title = input.job_title,
            name = input.applicant_name,
            resume = input.resume_text,
            description = input.job_description,
            requirements = input.requirements,
            skills = input.skill_tags.join(", "),
        );

        let text = self.complete(prompt, 2000).await?;
        let mut result: ScreeningResult = parse_reply(&text, '{', '}')?;
        result.overall_score = result.overall_score.clamp(0, 100);
        Ok(result)
    }

    async fn interview_questions(
        &self,
        context: &InterviewContext,
    ) -> Result<Vec<InterviewQuestion>, IntegrationError> {
        let prompt = format!(
            "Generate 5 interview questions for a {title} position.\n\n\
             Responsibilities: {responsibilities}\n\nRequirements: {requirements}\n\n\
             Skills: {skills}\n\n\
             Reply with a JSON array only, each item shaped as \
             {{\"id\": \"q1\", \"type\": \"introduction|experience|technical|situational|closing\", \
             \"question\": \"...\", \"timeLimit\": 120, \"category\": \"...\"}}",
            title = context.job_title,
            responsibilities = context.responsibilities,
            requirements = context.requirements,
            skills = context.skill_tags.join(", "),
        );

        let text = self.complete(prompt, 2000).await?;
        parse_reply(&text, '[', ']')
    }

    async fn analyze_interview(
        &self,
        context: &InterviewContext,
        answers: &[InterviewAnswer],
    ) -> Result<InterviewAnalysis, IntegrationError> {
        let transcript = serde_json::to_string_pretty(answers).map_err(|err| {
            IntegrationError::InvalidResponse {
                provider: PROVIDER,
                message: err.to_string(),
            }
        })?;
        let prompt = format!(
            "Analyze this job interview for a {title} position.\n\n\
             Questions and responses:\n{transcript}\n\n\
             Reply with JSON only, in this format:\n\
             {{\"overallScore\": 0-100, \"communicationScore\": 0-100, \"technicalScore\": 0-100, \
             \"cultureFitScore\": 0-100, \"summary\": \"...\", \"strengths\": [\"...\"], \
             \"areasForImprovement\": [\"...\"], \"recommendation\": \"PROCEED|REVIEW|REJECT\", \
             \"questionAnalysis\": [{{\"questionId\": \"q1\", \"score\": 0-100, \"feedback\": \"...\"}}]}}",
            title = context.job_title,
        );

        let text = self.complete(prompt, 3000).await?;
        let mut analysis: InterviewAnalysis = parse_reply(&text, '{', '}')?;
        analysis.overall_score = analysis.overall_score.clamp(0, 100);
        Ok(analysis)
    }
}

pub struct MockAi;

#[async_trait]
impl AiProvider for MockAi {
    async fn screen_application(
        &self,
        input: &ScreeningInput,
    ) -> Result<ScreeningResult, IntegrationError> {
        let mut rng = seeded_rng(input.application_id);
        let overall_score = rng.gen_range(70..100);
        let adjective = if rng.gen_bool(0.5) { "strong" } else { "promising" };
        let recommendation = if rng.gen_bool(0.7) { "RECOMMEND" } else { "REVIEW" };
        let skill_matches = input
            .skill_tags
            .iter()
            .map(|skill| SkillMatch {
                skill: skill.clone(),
                matched: rng.gen_bool(0.7),
                confidence: rng.gen_range(70..100),
            })
            .collect();

        Ok(ScreeningResult {
            overall_score,
            summary: format!(
                "{} is a {adjective} candidate for the {} position. Their background shows relevant experience in the required areas.",
                input.applicant_name, input.job_title
            ),
            strengths: vec![
                "Strong technical background".to_string(),
                "Relevant industry experience".to_string(),
                "Good communication skills indicated in cover letter".to_string(),
            ],
            weaknesses: vec![
                "Limited experience with specific tools mentioned".to_string(),
                "May need onboarding time for team processes".to_string(),
            ],
            recommendation: recommendation.to_string(),
            skill_matches,
        })
    }

    async fn interview_questions(
        &self,
        context: &InterviewContext,
    ) -> Result<Vec<InterviewQuestion>, IntegrationError> {
        let focus_skill = context
            .skill_tags
            .first()
            .map(String::as_str)
            .unwrap_or("this role");
        let first_responsibility = context
            .responsibilities
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("the main responsibilities of this role");

        let question = |id: &str, kind: &str, text: String, time_limit: u32, category: &str| {
            InterviewQuestion {
                id: id.to_string(),
                kind: kind.to_string(),
                question: text,
                time_limit,
                category: category.to_string(),
            }
        };

        Ok(vec![
            question(
                "q1",
                "introduction",
                format!(
                    "Tell us about yourself and why you're interested in the {} position.",
                    context.job_title
                ),
                120,
                "Background",
            ),
            question(
                "q2",
                "experience",
                format!(
                    "Describe a challenging project you've worked on that's relevant to {focus_skill}. What was your approach and what was the outcome?"
                ),
                180,
                "Experience",
            ),
            question(
                "q3",
                "technical",
                format!(
                    "How would you approach {first_responsibility}? Walk us through your thought process."
                ),
                180,
                "Technical",
            ),
            question(
                "q4",
                "situational",
                "Describe a time when you had to learn a new tool or technology quickly. How did you approach the learning process?".to_string(),
                150,
                "Adaptability",
            ),
            question(
                "q5",
                "closing",
                "What questions do you have for us about the role or working with our team?".to_string(),
                120,
                "Questions",
            ),
        ])
    }

    async fn analyze_interview(
        &self,
        context: &InterviewContext,
        answers: &[InterviewAnswer],
    ) -> Result<InterviewAnalysis, IntegrationError> {
        let mut rng = seeded_rng(context.application_id);
        let overall_score = rng.gen_range(75..100);
        let communication_score = rng.gen_range(80..100);
        let technical_score = rng.gen_range(70..100);
        let culture_fit_score = rng.gen_range(80..100);
        let recommendation = if rng.gen_bool(0.8) { "PROCEED" } else { "REVIEW" };
        let question_analysis = answers
            .iter()
            .map(|answer| {
                let depth = if rng.gen_bool(0.5) { "comprehensive" } else { "adequate" };
                QuestionFeedback {
                    question_id: answer.question_id.clone(),
                    score: rng.gen_range(80..100),
                    feedback: format!("Response was {depth} and addressed the key points."),
                }
            })
            .collect();

        Ok(InterviewAnalysis {
            overall_score,
            communication_score,
            technical_score,
            culture_fit_score,
            summary: format!(
                "{} demonstrated strong communication skills and relevant experience during the interview. Their responses showed good understanding of the {} role requirements.",
                context.applicant_name, context.job_title
            ),
            strengths: vec![
                "Clear and articulate communication".to_string(),
                "Relevant experience demonstrated".to_string(),
                "Good problem-solving approach".to_string(),
                "Enthusiasm for the role".to_string(),
            ],
            areas_for_improvement: vec![
                "Could provide more specific examples".to_string(),
                "Technical depth could be explored further".to_string(),
            ],
            recommendation: recommendation.to_string(),
            question_analysis,
        })
    }
}

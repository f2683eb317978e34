// Prompt text for the resume rewrite.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, TRUTHFULNESS_INSTRUCTION};

/// Persona line of the system prompt; the JSON-only rules are appended by `system_prompt`.
const OPTIMIZATION_PERSONA: &str = "You are a professional resume writer and career coach \
    with 15+ years of experience optimizing resumes for specific job postings.";

pub fn system_prompt() -> String {
    format!("{OPTIMIZATION_PERSONA} {JSON_ONLY_SYSTEM}")
}

/// Builds the user prompt for one order.
pub fn optimization_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"Optimize the resume below for the job posting below and write a tailored cover letter.

RESUME CONTENT:
{resume_text}

JOB DESCRIPTION:
{job_description}

INSTRUCTIONS:
1. Identify the key requirements, skills and qualifications in the job description.
2. Rewrite the resume to match those requirements.
3. Strengthen bullet points with action verbs and quantifiable achievements already present in the resume.
4. Reorder the skills section so the most relevant skills come first.
5. Use ATS-friendly formatting and the job description's keywords.
6. Write a cover letter connecting the candidate's experience to the role.
7. Score how well the optimized resume matches the job from 0 to 100 and list the key changes you made.

{TRUTHFULNESS_INSTRUCTION}

Return a JSON object with this EXACT schema (no extra fields):
{{
  "optimizedResume": "Complete optimized resume in markdown",
  "coverLetter": "Professional cover letter in markdown",
  "keyChanges": ["One short sentence per key change"],
  "matchScore": 85
}}"#
    )
}

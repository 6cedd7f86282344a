// Prompts for résumé and job posting extraction.
// The JSON shapes here are the contract parsed by `extraction::models`.

pub const EXTRACTION_SYSTEM: &str = "You are an expert HR analyst. \
    You read résumés and job postings and extract their key facts as strict JSON.";

pub const RESUME_EXTRACT_PROMPT_TEMPLATE: &str = r#"
Extract the key information from the résumé below.

Return JSON with exactly this shape:
{
  "identite": {
    "nom": "",
    "contact": { "email": "", "telephone": "", "adresse": "" }
  },
  "competences": [],
  "resume_experience": "",
  "job_title": ""
}

- "competences": the candidate's skills, one short item each (e.g. "Python", "Git").
- "resume_experience": two or three sentences summarising the candidate's experience.
- "job_title": the candidate's current or most recent title.

RÉSUMÉ:
{document_text}
"#;

pub const JOB_EXTRACT_PROMPT_TEMPLATE: &str = r#"
Extract the key information from the job posting below.

Return JSON with exactly this shape:
{
  "job_title": "",
  "job_competences": []
}

- "job_competences": the key skills the posting asks for (e.g. "Git", "Python", "JavaScript").

JOB POSTING:
{job_description}
"#;

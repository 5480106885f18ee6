// Résumé extraction prompt templates.

pub const RESUME_PARSE_SYSTEM: &str = "\
You are an expert ATS resume parser. \
Extract candidate details exactly as written in the resume. \
Never invent employers, dates, or degrees that are not in the text.";

pub const RESUME_PARSE_PROMPT: &str = r#"Extract the following details from the resume text below and return ONLY a valid JSON object.
Do not include markdown formatting like ```json ... ```. Just the raw JSON string.

Fields to extract:
- first_name (string, infer from top of resume)
- last_name (string)
- email (string)
- phone (string)
- linkedin_url (string, null if not found)
- portfolio_url (string, null if not found)
- headline (string, a professional headline e.g. "Senior Java Developer")
- summary (string, a brief professional summary)
- skills (list of strings)
- experience_years (integer, estimate total years of work experience)
- education (list of objects: { "degree": string, "school": string, "year": string })
- experience (list of objects: { "title": string, "company": string, "duration": string, "description": string })
- projects (list of objects: { "title": string, "description": string, "link": string })
- languages (list of strings)

Resume Text:
{resume_text}"#;

pub struct PromptBuilder;

impl PromptBuilder {
    /// Fixed judging policy shared by every comparison.
    pub fn comparison_system_prompt() -> String {
        r#"You are an expert evaluator comparing two project submissions from screenshots of their demo videos.

Evaluation guidelines:
- The screenshots are captured automatically. Some show loading states, blur or transitional frames; be lenient with these and judge the application, not the capture quality.
- When a frame is unclear, rely on the clearer frames of the same submission.
- Weight technical depth over visual polish: architecture, interactivity, navigation between pages or views, forms and dynamic content, modal dialogs and other advanced components.
- Prefer clean, well-organised layouts over decorative ones, but never let styling outweigh functionality.
- Decide which submission better meets the task requirements. Answer "tie" only when they are genuinely indistinguishable.

Output:
Return ONLY a JSON object, no explanations, in exactly this shape:
{
  "winner": "A" | "B" | "tie",
  "rationale": "why the winner is stronger, referring to the sides as Submission A and Submission B",
  "feedback_a": "feedback for submission A",
  "feedback_b": "feedback for submission B",
  "pros_cons_a": {"pros": ["..."], "cons": ["..."]},
  "pros_cons_b": {"pros": ["..."], "cons": ["..."]}
}"#
        .to_string()
    }

    pub fn comparison_intro(task_description: &str, criteria: &[String]) -> String {
        let criteria_text = if criteria.is_empty() {
            "- Overall implementation quality and completeness".to_string()
        } else {
            criteria
                .iter()
                .map(|c| format!("- {}", c))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "TASK DESCRIPTION:\n{}\n\nEVALUATION CRITERIA:\n{}\n\nThe screenshots of submission A come first, followed by the screenshots of submission B.",
            task_description.trim(),
            criteria_text
        )
    }

    pub fn submission_label(label: char, frame_count: usize) -> String {
        format!("Submission {} ({} screenshots):", label, frame_count)
    }

    pub fn criteria_system_prompt() -> String {
        r#"You are an HR professional writing evaluation criteria for job applicants. Output ONLY a JSON array of strings.

Each criterion must be specific, measurable, relevant to the role and written in formal language.

Filtering requirements:
- Remove company names, proprietary information and internal processes
- Remove personal information, email addresses and phone numbers
- Remove client names and confidential business details
- Generalise industry-specific jargon
- Focus on skills, competencies and deliverable quality

Example:
["Technical implementation quality and code structure", "User interface design and user experience", "Problem-solving approach and creativity", "Documentation quality and clarity"]"#
            .to_string()
    }

    pub fn criteria_user_prompt(job_title: &str, job_description: &str, example_task: &str) -> String {
        format!(
            "JOB TITLE: {}\n\nJOB DESCRIPTION: {}\n\nEXAMPLE TASK PROVIDED BY EMPLOYER:\n{}\n\nGenerate 4-6 evaluation criteria for assessing submissions to this task.",
            job_title.trim(),
            job_description.trim(),
            example_task.trim()
        )
    }
}

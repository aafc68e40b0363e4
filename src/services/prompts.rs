use serde_json::{json, Value};

use crate::db::models::TranscriptEntry;

pub(crate) const TUTOR_SYSTEM_PROMPT: &str = r#"You are a patient math tutor who teaches through Socratic dialogue.
Never state the final answer and never solve the problem for the student.
Ask one focused guiding question at a time, build on what the student already wrote,
and point out mistakes by asking the student to re-check a specific step.
Use LaTeX between $ ... $ for math.

Judge the student's latest message:
- "progress_made": true if it moves the solution forward (a correct step, a correct idea, a fixed mistake).
- "gave_hint": true if your reply contains a hint (a method, formula, or first step), not just a question.
- "problem_solved": true only if the student has stated a correct final answer.

Respond with strict JSON:
{
  "tutor_message": "your reply to the student",
  "progress_made": <bool>,
  "gave_hint": <bool>,
  "problem_solved": <bool>
}
"#;

pub(crate) const CLASSIFY_SYSTEM_PROMPT: &str = r#"You classify math problems.
Pick a short lowercase category such as "arithmetic", "fractions", "algebra", "geometry",
"trigonometry", "calculus", "probability", "statistics", "number theory", or "word problem".
Pick a difficulty: "easy", "medium", or "hard".
Respond with strict JSON: {"category": "...", "difficulty": "..."}
"#;

pub(crate) const EXTRACT_SYSTEM_PROMPT: &str = r#"You transcribe math problems from photos.
Copy the problem statement exactly as written, using LaTeX between $ ... $ for math.
Do not solve it. If the image does not contain a readable math problem, set "readable" to false
and explain why in "reason".
Respond with strict JSON: {"readable": <bool>, "problem_text": "...", "reason": null}
"#;

pub(crate) const SIMILAR_SYSTEM_PROMPT: &str = r#"You write practice problems for math students.
Given a problem, write new problems that practice the same skill with different numbers or context.
Do not include solutions.
Respond with strict JSON: {"problems": [{"text": "...", "difficulty": "easy|medium|hard"}]}
"#;

/// Instructions appended once the student has been stuck for too long.
const ESCALATION_NOTE: &str = "The student has been stuck for several turns. Give a concrete \
hint that names the next step or the relevant rule, then ask them to try it. Still do not \
give the final answer.";

pub(crate) fn tutor_messages(
    problem: &str,
    history: &[TranscriptEntry],
    student_message: &str,
    hints_used: i32,
    stuck_turns: i32,
    escalate: bool,
) -> Vec<Value> {
    let mut system = format!(
        "{TUTOR_SYSTEM_PROMPT}\nProblem being worked on:\n{problem}\n\n\
         Hints given so far: {hints_used}. Consecutive turns without progress: {stuck_turns}."
    );
    if escalate {
        system.push_str("\n\n");
        system.push_str(ESCALATION_NOTE);
    }

    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(json!({"role": "system", "content": system}));
    for entry in history {
        messages.push(json!({"role": "user", "content": entry.student_message}));
        messages.push(json!({"role": "assistant", "content": entry.tutor_message}));
    }
    messages.push(json!({"role": "user", "content": student_message}));
    messages
}

pub(crate) fn classify_messages(problem: &str) -> Vec<Value> {
    vec![
        json!({"role": "system", "content": CLASSIFY_SYSTEM_PROMPT}),
        json!({"role": "user", "content": problem}),
    ]
}

pub(crate) fn extract_messages(image_data_url: &str) -> Vec<Value> {
    vec![
        json!({"role": "system", "content": EXTRACT_SYSTEM_PROMPT}),
        json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "Transcribe the math problem in this image."},
                {"type": "image_url", "image_url": {"url": image_data_url}}
            ]
        }),
    ]
}

pub(crate) fn similar_messages(problem: &str, count: u32) -> Vec<Value> {
    vec![
        json!({"role": "system", "content": SIMILAR_SYSTEM_PROMPT}),
        json!({
            "role": "user",
            "content": format!("Write exactly {count} similar problems for:\n{problem}")
        }),
    ]
}

/// Written to `~/.spoar/knowledge_base.json` by onboarding when no knowledge
/// base exists yet.
pub const SAMPLE_KNOWLEDGE_BASE: &str = r#"[
  {
    "title": "VPN Setup Guide",
    "content": "Install the company VPN client from the IT portal, sign in with your SSO account and choose the nearest region. Contact IT if the connection drops repeatedly."
  },
  {
    "title": "Expense Reimbursement Policy",
    "content": "Submit receipts through the finance portal within 30 days of purchase. Expenses over $500 need manager approval before reimbursement."
  },
  {
    "title": "Remote Work Policy",
    "content": "Employees may work remotely up to three days per week. Core collaboration hours are 10:00 to 15:00 in your team's time zone."
  },
  {
    "title": "Password Reset",
    "content": "Reset your password at the self-service portal. Passwords must be at least 14 characters and are rotated every 180 days."
  },
  {
    "title": "Paid Time Off",
    "content": "Full-time employees accrue 20 days of paid time off per year. Requests should be submitted two weeks in advance through the HR system."
  }
]
"#;

/// Model suggested by onboarding for each provider preset.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "gpt-4o-mini",
        "openrouter" => "meta-llama/llama-3.3-70b-instruct",
        _ => "llama-3.3-70b-versatile",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoar_core::tools::Document;

    #[test]
    fn sample_knowledge_base_parses() {
        let documents: Vec<Document> = serde_json::from_str(SAMPLE_KNOWLEDGE_BASE).unwrap();
        assert_eq!(documents.len(), 5);
        assert!(documents.iter().any(|d| d.title == "VPN Setup Guide"));
    }

    #[test]
    fn groq_is_the_fallback_model() {
        assert_eq!(default_model("groq"), "llama-3.3-70b-versatile");
        assert_eq!(default_model("unknown"), "llama-3.3-70b-versatile");
    }
}

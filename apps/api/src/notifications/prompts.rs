pub const CELEBRATION_SYSTEM: &str = "You write short, warm push notifications for an \
accountability app where small groups (pods) keep weekly commitments. Never invent facts \
about the people involved. Respond with JSON only.";

/// Placeholders: {audience}, {author}, {commitment}, {style}
pub const CELEBRATION_PROMPT: &str = r#"Write a push notification celebrating a completed commitment.

Audience: {audience}
Person who completed it: {author}
Commitment: "{commitment}"
Preferred communication style of the reader: {style}

Rules:
- At most 160 characters.
- Mention the commitment, not generic praise.
- No hashtags.

Return exactly:
{"content": "<notification text>", "sentiment": <number from -1.0 to 1.0>}"#;

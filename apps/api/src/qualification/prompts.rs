// Prompt templates for lead qualification and outreach drafting.
// Both prompts are pure functions of the lead, the reference context and (for
// outreach) the verdict. They never depend on which backend will run them.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::models::lead::Lead;
use crate::qualification::verdict::{Assessment, Authority, Urgency};
use crate::reference::{PainPointCatalog, ReferenceContext};

/// Examples shown per matched pain-point category.
const EXAMPLES_PER_PAIN: usize = 2;

pub const QUALIFICATION_SYSTEM: &str =
    "You are an expert lead qualification analyst for B2B sales.";

pub const OUTREACH_SYSTEM: &str =
    "You are an expert at writing personalized, vibe-matched outreach messages.";

/// Qualification prompt. Placeholders are filled by `build_qualification_prompt`.
pub const QUALIFICATION_PROMPT_TEMPLATE: &str = r#"You are an expert lead qualification analyst for B2B sales.

COMPANY CONTEXT:
Product: {company_name} - {product}
What we solve: {value_propositions}

TARGET AUDIENCE:
- Industries: {industries}
- Titles: {titles}
- Location: {locations}

LEAD TO ANALYZE:
Name: {name}
Title: {title}
Company: {company}
Source: {source}
Date: {date}

What they said:
"""{content}"""

YOUR TASK:
Analyze this lead with EXTREME RIGOR. Quality matters more than quantity.

1. PAIN POINT DETECTION:
   - Does this person mention operational challenges, directly or by implication?
   - Which specific pain points do they mention?
   - Pain clarity: EXPLICIT (stated directly) / IMPLICIT (suggested) / NONE

2. URGENCY ASSESSMENT:
   - HIGH: "urgent", "crisis", "losing money", concrete losses mentioned
   - MEDIUM: "struggling", "difficult", "need help", "looking for a solution"
   - LOW: "exploring", "thinking about", "considering"
   - NONE: no urgency indicators

3. AUTHORITY EVALUATION:
   - DECISION_MAKER: Owner, Founder, Director, C-level
   - INFLUENCER: Manager, Head, Team Lead
   - UNKNOWN: title unclear
   - LOW: Junior, Assistant, Student

4. SPECIFICITY SCORE (1-10):
   - 10 = specific numbers, detailed problems, concrete examples
   - 5 = general problem statement
   - 1 = vague or generic

5. INDUSTRY & SIZE FIT:
   - Is this in our target industry?
   - Right company size (MSME, 10-500 employees)?

6. LEAD SCORE:
   - A+ : explicit pain + decision maker + high urgency + specific details
   - A  : clear pain + authority + medium urgency
   - B  : pain mentioned but lower urgency or unclear authority
   - C  : weak signals, disqualify

7. DISQUALIFICATION CHECK:
   - Spam or promotional?
   - Student or researcher?
   - Wrong industry?
   - Not a real pain point?

{json_only}

Required fields:
- score: one of "A+", "A", "B", "C"
- pain_points: array of strings
- pain_clarity: one of "EXPLICIT", "IMPLICIT", "NONE"
- urgency: one of "HIGH", "MEDIUM", "LOW", "NONE"
- authority: one of "DECISION_MAKER", "INFLUENCER", "UNKNOWN", "LOW"
- specificity_score: integer 1-10
- industry_fit: true or false
- size_fit: true or false
- disqualify: true or false
- disqualify_reason: string (empty if not disqualified)
- reasoning: string (2-3 sentences)
- key_signals: array of strings
- missing_signals: array of strings

BE STRICT. Only A+ and A leads are worth pursuing. When in doubt, score lower.
"#;

/// Outreach prompt. Placeholders are filled by `build_message_prompt`.
pub const MESSAGE_PROMPT_TEMPLATE: &str = r#"You are an expert at writing personalized B2B outreach messages that feel authentic and helpful, not salesy.

COMPANY CONTEXT:
Product: {company_name} - {product}
Communication style: {tone}
Language: {language}

AVOID: {avoid}
PREFER: {prefer}

LEAD CONTEXT:
Name: {name}
Title: {title}
Company: {company}

What they said:
"""{content}"""

ANALYSIS:
Pain points: {pain_points}
Urgency: {urgency}
Authority: {authority}
Key signals: {key_signals}
{pain_examples}

YOUR TASK:
Write a PERSONALIZED outreach message that:

1. MATCHES THEIR VIBE:
   - Frustrated or urgent: acknowledge the pain, be direct
   - Exploring: be helpful, offer options
   - Skeptical: lead with proof and data
   - Mirror their register (formal or casual)

2. REFERENCES THEIR SPECIFIC SITUATION:
   - Quote or paraphrase what they said
   - Connect to their numbers and details if they gave any

3. POSITIONS VALUE WITHOUT SELLING:
   - Do not pitch the product
   - Share how similar companies solved this
   - Offer to "share the playbook", not "schedule a demo"

4. KEEPS IT BRIEF:
   - Under 150 words
   - 2-3 short paragraphs
   - Natural language, not corporate speak

5. ENDS WITH A LOW-PRESSURE NEXT STEP:
   - "Happy to share what worked", not "Let's schedule a call"
   - Make it easy to say yes

Return ONLY the message text, no extra formatting or explanation.
The message should read like it comes from a peer who wants to help, not a salesperson.
"#;

/// Builds the qualification prompt for `lead`.
pub fn build_qualification_prompt(lead: &Lead, reference: &ReferenceContext) -> String {
    let company = &reference.company;
    let audience = &reference.audience.audience;

    fill(
        QUALIFICATION_PROMPT_TEMPLATE,
        &[
            ("company_name", &company.company.name),
            ("product", &company.company.product),
            ("value_propositions", &company.value_propositions.primary.join(", ")),
            ("industries", &audience.industries.high_priority.join(", ")),
            ("titles", &audience.titles.primary.join(", ")),
            ("locations", &audience.locations.primary.join(", ")),
            ("json_only", JSON_ONLY_INSTRUCTION),
            ("name", lead.name_or_unknown()),
            ("title", lead.title_or_unknown()),
            ("company", lead.company_or_unknown()),
            ("source", lead.source_or_unknown()),
            ("date", lead.date_or_unknown()),
            ("content", lead.content_text()),
        ],
    )
}

/// Builds the outreach prompt for a lead that passed the message gate.
pub fn build_message_prompt(
    lead: &Lead,
    assessment: &Assessment,
    reference: &ReferenceContext,
) -> String {
    let company = &reference.company;
    let style = &company.communication_style;

    fill(
        MESSAGE_PROMPT_TEMPLATE,
        &[
            ("company_name", &company.company.name),
            ("product", &company.company.product),
            ("tone", &style.tone),
            ("language", &style.language),
            ("avoid", &style.avoid.join(", ")),
            ("prefer", &style.prefer.join(", ")),
            ("pain_points", &assessment.pain_points.join(", ")),
            ("urgency", urgency_label(assessment.urgency)),
            ("authority", authority_label(assessment.authority)),
            ("key_signals", &assessment.key_signals.join(", ")),
            (
                "pain_examples",
                &pain_point_context(&assessment.pain_points, &reference.pain_points),
            ),
            ("name", lead.name_or_unknown()),
            ("title", lead.title_or_unknown()),
            ("company", lead.company_or_unknown()),
            ("content", lead.content_text()),
        ],
    )
}

/// Substitutes `{key}` slots in a single left-to-right pass. Inserted values
/// are never rescanned, and braces that name no key are copied through.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let slot = &rest[open + 1..];
        let value = slot.find('}').and_then(|close| {
            let key = &slot[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close + 1))
        });
        match value {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &slot[consumed..];
            }
            None => {
                out.push('{');
                rest = slot;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Up to two examples for every taxonomy entry whose name contains a detected
/// pain label (case-insensitive). Empty when nothing matches.
pub fn pain_point_context(detected: &[String], catalog: &PainPointCatalog) -> String {
    let mut parts = Vec::new();

    for pain in detected {
        let needle = pain.to_lowercase();
        for definition in &catalog.pain_points.primary_pains {
            if !definition.name.to_lowercase().contains(&needle) {
                continue;
            }
            if definition.ideal_lead_examples.is_empty() {
                continue;
            }
            parts.push(format!("\n{} examples:", definition.name));
            parts.push(
                definition
                    .ideal_lead_examples
                    .iter()
                    .take(EXAMPLES_PER_PAIN)
                    .map(|ex| format!("- {ex}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
    }

    parts.join("\n")
}

fn urgency_label(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::High => "HIGH",
        Urgency::Medium => "MEDIUM",
        Urgency::Low => "LOW",
        Urgency::None => "NONE",
    }
}

fn authority_label(authority: Authority) -> &'static str {
    match authority {
        Authority::DecisionMaker => "DECISION_MAKER",
        Authority::Influencer => "INFLUENCER",
        Authority::Unknown => "UNKNOWN",
        Authority::Low => "LOW",
    }
}

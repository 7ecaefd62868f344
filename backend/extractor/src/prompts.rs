//! Instruction templates for the three extraction stages.
//!
//! The instructions are bound to the assistant when it is created and fix the
//! output contract. The user prompt is posted per call and names the subject.

use pdfmetrics_core::{Stage, TimePeriod};

/// Everything one stage sends to the assistant service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePrompt {
    pub stage: Stage,
    pub assistant_name: &'static str,
    pub instructions: String,
    pub user_prompt: String,
}

/// Stage 1: find the metric's value and unit for the period.
pub fn value_unit(metric: &str, unit: &str, period: &TimePeriod, document_name: &str) -> StagePrompt {
    let instructions = format!(
        r#"**Objective:**
Extract **{metric}** specifically in the unit **{unit}**.

---

## Extraction Instructions:
1. **Extract exactly 1 metric without exception:**
   - Ensure **{metric}** is included in the output even if no value is found. In that case leave "Value" as an empty string.
2. **Identify and extract the value:**
   - Locate the metric and extract its numerical value for the requested period.
3. **Recognize units:**
   - Extract the unit mentioned alongside the value; if it differs from **{unit}**, record it as presented.
4. **Determine the time period:**
   - Focus on the period {period}.
5. **Handle variations:**
   - Account for abbreviations, alternative units, and different formatting styles (e.g., decimals, percentages, or written numbers).

---

## Mandatory JSON Output Format:

```json
{{
  "metrics_table": [
    {{"Metric": "{metric}", "Value": "", "Unit": "{unit}", "Time Period": "{period}"}}
  ]
}}
```
"#
    );
    StagePrompt {
        stage: Stage::ValueUnit,
        assistant_name: "Data Extraction Assistant",
        instructions,
        user_prompt: format!(
            "Analyze {document_name} and extract the **{metric}** value (in **{unit}**) over {period}."
        ),
    }
}

/// Stage 2: retrieve the text surrounding a confirmed value.
pub fn context(metric: &str, value: &str, unit: &str, period: &TimePeriod) -> StagePrompt {
    let instructions = format!(
        r#"# Extracting the context of 1 metric from a document
Search the document for the phrase {metric} along with the value {value} {unit} and the period {period}, and return the passage that reports it.

## Mandatory JSON Output Format

```json
{{
  "context_table": [
    {{"Context": ""}}
  ]
}}
```
"#
    );
    StagePrompt {
        stage: Stage::Context,
        assistant_name: "Context Extraction Assistant",
        instructions,
        user_prompt: format!(
            "Analyse the document, extract the context of {metric}, {value} and {unit}"
        ),
    }
}

/// Stage 3: locate the page(s) carrying the value and score the match.
pub fn page_location(metric: &str, value: &str, unit: &str, context: &str) -> StagePrompt {
    let instructions = format!(
        r#"## Task
You are skilled in extracting precise information from documents. Given a metric, its value, unit, and context, identify the exact page number where this information appears in the document.

## Input
- **Metric:** {metric}
- **Value:** {value}
- **Unit:** {unit}
- **Context:** {context}

## Instructions
1. Search through the document and locate the exact page number where this information appears.
2. If multiple pages contain relevant information, list all page numbers.
3. Provide a **confidence score (0-100)** for the accuracy of the page number retrieval.

## Mandatory JSON Output Format

```json
{{
  "page_table": [
    {{"Page Number(s)": "", "Confidence Score": ""}}
  ]
}}
```
"#
    );
    StagePrompt {
        stage: Stage::PageLocation,
        assistant_name: "Page Extraction Assistant",
        instructions,
        user_prompt: format!(
            "Identify the exact page number where this information appears in the document: {metric}, {value}, {unit} and {context}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_block::extract_json;

    #[test]
    fn value_unit_names_subject_and_contract() {
        let p = value_unit("Revenue", "USD", &TimePeriod::new("2023"), "annual-report.pdf");
        assert_eq!(p.stage, Stage::ValueUnit);
        assert!(p.instructions.contains("**Revenue**"));
        assert!(p.instructions.contains("\"metrics_table\""));
        assert!(p.instructions.contains("\"Time Period\": \"2023\""));
        assert_eq!(
            p.user_prompt,
            "Analyze annual-report.pdf and extract the **Revenue** value (in **USD**) over 2023."
        );
    }

    #[test]
    fn templates_embed_parseable_json_shapes() {
        let period = TimePeriod::new("2023");
        let shapes = [
            (value_unit("Revenue", "USD", &period, "doc.pdf"), "metrics_table"),
            (context("Revenue", "500", "USD million", &period), "context_table"),
            (page_location("Revenue", "500", "USD million", "Revenue was 500"), "page_table"),
        ];
        for (prompt, key) in shapes {
            let shape = extract_json(&prompt.instructions).expect("template JSON parses");
            assert!(shape[key].is_array(), "{key} missing from {:?}", prompt.stage);
        }
    }

    #[test]
    fn page_location_keeps_value_and_unit_apart() {
        let p = page_location("Revenue", "500", "USD million", "ctx");
        assert!(p.instructions.contains("**Value:** 500"));
        assert!(p.instructions.contains("**Unit:** USD million"));
        assert!(p.user_prompt.ends_with("Revenue, 500, USD million and ctx"));
    }
}

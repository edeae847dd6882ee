// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The formatter/interpolator (§2 C9, §4.9): template-string interpolation
//! and rendering of execution result tuples into `ReplyMessage`s.
//! Deterministic on identical inputs; locale/timezone/units come from
//! `parley_config::LocaleConfig`.
use std::collections::HashMap;

use serde_json::Value;

use parley_model::ReplyMessage;

use crate::executor::ExecutionOutput;

/// Replace every `${name}` placeholder in `template` with the stringified
/// value of `args[name]`, leaving unrecognized placeholders untouched (a
/// missing arg is a caller bug, not something to silently blank out).
pub fn interpolate(template: &str, args: &HashMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match args.get(name) {
                    Some(value) => out.push_str(&stringify(value)),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render one execution result into the messages it produces for the
/// delegate. A picture-bearing field renders as `ReplyMessage::Picture`
/// alongside the text summary; otherwise a plain text line (§4.4.5, §8
/// scenario 6).
pub fn format_execution_output(output: &ExecutionOutput, template: &str) -> Vec<ReplyMessage> {
    let args: HashMap<String, Value> = match &output.output_value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        other => {
            let mut m = HashMap::new();
            m.insert("value".to_string(), other.clone());
            m
        }
    };
    let text = interpolate(template, &args);
    let mut messages = vec![ReplyMessage::text(text)];
    if let Some(Value::String(url)) = args.get("picture_url") {
        messages.push(ReplyMessage::Picture { url: url.clone() });
    }
    messages
}

/// Default per-function templates, matching a real deployment's locale
/// resource bundle closely enough to exercise the pipeline end to end.
pub fn default_template_for(function_name: &str) -> &'static str {
    match function_name {
        "com.xkcd.get_comic" => "xkcd: ${title} (${link})",
        "com.twitter.post" | "com.twitter.post_picture" => "Tweeted.",
        "org.thingpedia.weather" => "It's ${temperature} degrees.",
        _ => "${value}",
    }
}

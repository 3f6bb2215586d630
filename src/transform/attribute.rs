//! Attribute cleanup.
//!
//! Word exports carry piles of presentational attributes the reader engine
//! chokes on. Two configured rule families handle them, both keyed by
//! `(element, attribute)`:
//!
//! - `attribute.remove.<elem>.<attr> = true` strips the attribute
//!   everywhere it appears.
//! - `attribute.replace.<elem>.<attr>[.<variant>] = [substr,]newvalue`
//!   rewrites the value, either unconditionally or only when the current
//!   value contains `substr`. An empty `newvalue` removes the attribute.
//!
//! Rules are evaluated in sorted key order; the first rule matching an
//! attribute instance wins.

use crate::config::{self, Config};
use crate::error::{Error, Result};

use super::{Context, Pass};

pub struct AttributePass;

#[derive(Debug)]
enum Rule {
    Remove,
    Replace {
        substr: Option<String>,
        value: String,
    },
}

#[derive(Debug)]
struct RuleSet {
    /// `(element, attribute, rule)` in configuration key order.
    rules: Vec<(String, String, Rule)>,
}

impl RuleSet {
    fn from_config(config: &Config) -> Result<RuleSet> {
        let mut rules = Vec::new();

        for key in config.keys_with_prefix(config::PROP_ATTRIBUTE_REMOVE) {
            let value = config.get(key).unwrap_or_default();
            if !matches!(value, "true" | "1" | "yes") {
                continue;
            }
            let (elem, attr) = parse_target(key, config::PROP_ATTRIBUTE_REMOVE)?;
            rules.push((elem, attr, Rule::Remove));
        }

        for key in config.keys_with_prefix(config::PROP_ATTRIBUTE_REPLACE) {
            let value = config.get(key).unwrap_or_default();
            let (elem, attr) = parse_target(key, config::PROP_ATTRIBUTE_REPLACE)?;
            let tokens: Vec<&str> = value.split(',').collect();
            let rule = match tokens.len() {
                1 => Rule::Replace {
                    substr: None,
                    value: tokens[0].trim().to_string(),
                },
                2 => Rule::Replace {
                    substr: Some(tokens[0].trim().to_string()),
                    value: tokens[1].trim().to_string(),
                },
                _ => {
                    return Err(Error::InvalidConfig(format!(
                        "invalid attribute replace: {key}={value}"
                    )))
                }
            };
            rules.push((elem, attr, rule));
        }

        Ok(RuleSet { rules })
    }
}

/// Extract `(element, attribute)` from a rule key. Keys may carry a
/// trailing variant segment to allow several rules per attribute.
fn parse_target(key: &str, prefix: &str) -> Result<(String, String)> {
    let rest = &key[prefix.len() + 1..];
    let mut parts = rest.split('.');
    let elem = parts.next().filter(|s| !s.is_empty());
    let attr = parts.next().filter(|s| !s.is_empty());
    match (elem, attr) {
        (Some(elem), Some(attr)) => Ok((elem.to_string(), attr.to_string())),
        _ => Err(Error::InvalidConfig(format!(
            "invalid attribute rule key: {key}"
        ))),
    }
}

impl Pass for AttributePass {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn run(&self, ctx: &mut Context) -> Result<()> {
        let rules = RuleSet::from_config(ctx.config)?;
        if rules.rules.is_empty() {
            return Ok(());
        }

        let root = match ctx.dom.root_element() {
            Some(root) => root,
            None => return Ok(()),
        };

        let elements = ctx.dom.find_all(root, |dom, id| dom.is_element(id));
        for el in elements {
            let elname = ctx.dom.element_name(el).unwrap_or_default().to_string();
            let attr_names: Vec<String> =
                ctx.dom.attrs(el).iter().map(|a| a.name.clone()).collect();

            for attr_name in attr_names {
                for (rule_elem, rule_attr, rule) in &rules.rules {
                    if *rule_elem != elname || *rule_attr != attr_name {
                        continue;
                    }
                    match rule {
                        Rule::Remove => {
                            ctx.dom.remove_attr(el, &attr_name);
                        }
                        Rule::Replace { substr, value } => {
                            let current = ctx.dom.attr(el, &attr_name).unwrap_or_default();
                            if let Some(substr) = substr {
                                if !current.contains(substr.as_str()) {
                                    continue;
                                }
                            }
                            if value.is_empty() {
                                ctx.dom.remove_attr(el, &attr_name);
                            } else {
                                ctx.dom.set_attr(el, &attr_name, value);
                            }
                        }
                    }
                    // First matching rule per attribute instance wins.
                    break;
                }
            }
        }
        Ok(())
    }
}

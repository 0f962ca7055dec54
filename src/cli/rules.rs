//! Rules command - list every rule id

use crate::models::RuleId;

/// One row per rule: id, default severity, default state, description
pub fn render() -> String {
    let width = RuleId::ALL
        .iter()
        .map(|r| r.as_str().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for rule in RuleId::ALL {
        let state = if rule.is_internal() {
            "reserved"
        } else if rule.enabled_by_default() {
            "on"
        } else {
            "off"
        };
        out.push_str(&format!(
            "{:<width$}  {:<7}  {:<8}  {}\n",
            rule.as_str(),
            rule.default_severity().as_str(),
            state,
            rule.description(),
            width = width
        ));
    }
    out
}

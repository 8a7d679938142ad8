//! Command Templater: expands `%`-escape templates into concrete helper
//! invocations.
//!
//! Two variants exist: the general templater (load/unload/list/...) and
//! the transfer templater, which supports a different, smaller set of
//! escapes and silently drops everything it doesn't recognize -- same
//! rule as the general templater's unknown-escape handling, just a
//! smaller whitelist.

use crate::slot::Slot;

/// Context for the general templater (`%o` = load, unload, loaded,
/// list, listall, slots, ...).
pub struct TemplateContext<'a> {
    pub changer_name: &'a str,
    pub operation: &'a str,
    /// Backs both `%s` and `%S` -- the wire protocol uses the same
    /// slot for both escapes outside of the transfer command.
    pub slot: Option<Slot>,
    pub drive_index: u32,
    pub control_path: &'a str,
    pub job_name: &'a str,
    pub volume_name: &'a str,
}

/// Context for the transfer templater (`%o` = transfer).
pub struct TransferTemplateContext<'a> {
    pub changer_name: &'a str,
    pub src_slot: Slot,
    pub dst_slot: Slot,
}

/// Expands `template` against `ctx`. Non-`%` bytes pass through
/// verbatim; `%%` is a literal `%`; an unrecognized `%x` (including a
/// trailing lone `%`) is elided with no output.
pub fn expand_template(template: &str, ctx: &TemplateContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('c') => out.push_str(ctx.changer_name),
            Some('o') => out.push_str(ctx.operation),
            Some('s') | Some('S') => {
                if let Some(slot) = ctx.slot {
                    out.push_str(&slot.get().to_string());
                }
            }
            Some('d') => out.push_str(&ctx.drive_index.to_string()),
            Some('f') => out.push_str(ctx.control_path),
            Some('j') => out.push_str(ctx.job_name),
            Some('v') => out.push_str(ctx.volume_name),
            // unknown escape (or `%` at end of string): emit nothing
            _ => {}
        }
    }

    out
}

/// Expands `template` for a `transfer` invocation. Supports `%%`, `%a`
/// (destination slot), `%c`, `%o` (always `"transfer"`), `%s`/`%S`
/// (source slot); every other escape is elided, including ones the
/// general templater supports (`%d`, `%f`, `%j`, `%v`).
pub fn expand_transfer_template(template: &str, ctx: &TransferTemplateContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('a') => out.push_str(&ctx.dst_slot.get().to_string()),
            Some('c') => out.push_str(ctx.changer_name),
            Some('o') => out.push_str("transfer"),
            Some('s') | Some('S') => out.push_str(&ctx.src_slot.get().to_string()),
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext<'static> {
        TemplateContext {
            changer_name: "/dev/sg0",
            operation: "load",
            slot: Slot::new(7),
            drive_index: 0,
            control_path: "/archive",
            job_name: "nightly",
            volume_name: "Vol-0001",
        }
    }

    #[test]
    fn identity_on_plain_text() {
        let s = "mtx status";
        assert_eq!(expand_template(s, &ctx()), s);
    }

    #[test]
    fn percent_percent_is_literal() {
        assert_eq!(expand_template("100%%", &ctx()), "100%");
    }

    #[test]
    fn unknown_escape_is_elided() {
        assert_eq!(expand_template("a%qb", &ctx()), "ab");
    }

    #[test]
    fn trailing_percent_is_elided() {
        assert_eq!(expand_template("abc%", &ctx()), "abc");
    }

    #[test]
    fn all_recognized_escapes_substitute() {
        let t = "%c %o %s %S %d %f %j %v";
        assert_eq!(expand_template(t, &ctx()), "/dev/sg0 load 7 7 0 /archive nightly Vol-0001");
    }

    #[test]
    fn missing_slot_emits_nothing_for_s() {
        let mut c = ctx();
        c.slot = None;
        assert_eq!(expand_template("slot=%s.", &c), "slot=.");
    }

    #[test]
    fn transfer_template_scenario_6() {
        let t = "mtx %c %o src=%s dst=%a";
        let ctx = TransferTemplateContext {
            changer_name: "/dev/sg0",
            src_slot: Slot::new(3).unwrap(),
            dst_slot: Slot::new(11).unwrap(),
        };
        assert_eq!(expand_transfer_template(t, &ctx), "mtx /dev/sg0 transfer src=3 dst=11");
    }

    #[test]
    fn transfer_template_drops_unsupported_escapes() {
        let t = "%j/%v/%d/%f";
        let ctx = TransferTemplateContext {
            changer_name: "/dev/sg0",
            src_slot: Slot::new(1).unwrap(),
            dst_slot: Slot::new(2).unwrap(),
        };
        assert_eq!(expand_transfer_template(t, &ctx), "///");
    }
}

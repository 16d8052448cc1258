//! Compressor and body-extraction tests.
//!
//! Local names are mangled, so assertions look for string literals and the
//! bound parameter names rather than helper names.

#[cfg(test)]
mod tests {
    use crate::compress::{prune_unused_helpers, Compressor, OxcCompressor, RESERVED_NAMES};
    use crate::error::CompileError;
    use crate::extract::extract_body;

    fn compress(source: &str) -> String {
        OxcCompressor.compress(source, &RESERVED_NAMES).unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // BOUND NAMES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_wrapper_keeps_name_and_params() {
        let out = compress(
            "function transformBulk(ctx, aspects, subjects, res) {\n  return subjects.length;\n}",
        );
        assert!(
            out.starts_with("function transformBulk(ctx,aspects,subjects,res){"),
            "{}",
            out
        );
        assert!(out.ends_with('}'));
    }

    #[test]
    fn test_reserved_names_are_not_renamed() {
        let out = compress(
            r#"function transformBulk(ctx, aspects, subjects, res) {
                const samples = [];
                subjects.forEach((subject) => {
                    aspects.forEach((aspect) => {
                        samples.push({ name: subject.name + '|' + aspect.name, value: res.body[ctx.window] });
                    });
                });
                return samples;
            }"#,
        );
        for reference in ["subjects.forEach", "aspects.forEach", "res.body", "ctx.window"] {
            assert!(out.contains(reference), "{} missing from {}", reference, out);
        }
    }

    #[test]
    fn test_inner_binding_may_reuse_bound_name() {
        let out = compress(
            "function transformBulk(ctx, aspects, subjects, res) { const out = []; for (const subject of subjects) { out.push(subject.name + 'ITEM_MARKER'); } return out; }",
        );
        assert!(
            out.starts_with("function transformBulk(ctx,aspects,subjects,res){"),
            "{}",
            out
        );
        assert!(out.contains("of subjects"), "{}", out);
        assert!(out.contains("ITEM_MARKER"), "{}", out);
    }

    #[test]
    fn test_default_on_bound_param_is_dropped() {
        let out = compress(
            "function toUrl(ctx, aspects, subjects, res = 'DEFAULT_MARKER') { return subjects.length; }",
        );
        assert!(out.starts_with("function toUrl(ctx,aspects,subjects,res){"), "{}", out);
        assert!(!out.contains("DEFAULT_MARKER"), "{}", out);
        assert!(out.contains("subjects.length"), "{}", out);
    }

    #[test]
    fn test_locals_are_mangled() {
        let out = compress(
            "function transformBySubject(ctx, aspects, subject, res) { let accumulatedSampleList = res.body.items; accumulatedSampleList.push(subject.name); return accumulatedSampleList; }",
        );
        assert!(!out.contains("accumulatedSampleList"), "{}", out);
        assert!(out.contains("res.body.items"), "{}", out);
    }

    #[test]
    fn test_compression_is_idempotent() {
        let once = compress("function transformBulk(ctx,aspects,subjects,res){return subjects.length}");
        let twice = compress(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dead_code_is_removed() {
        let out = compress(
            "function toUrl(ctx, aspects, subjects) { if (false) { return 'NEVER_REACHED'; } return ctx.baseUrl; }",
        );
        assert!(!out.contains("NEVER_REACHED"), "{}", out);
        assert!(out.contains("ctx.baseUrl"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_unused_helper_is_dropped() {
        let out = compress(
            "function transformBulk(ctx, aspects, subjects, res) { return subjects.map(s => label(s)); ;function label(s) { return 'USED_MARKER' + s.name; };function unused(x) { return 'UNUSED_MARKER' + x; }}",
        );
        assert!(out.contains("USED_MARKER"), "{}", out);
        assert!(!out.contains("UNUSED_MARKER"), "{}", out);
    }

    #[test]
    fn test_transitive_helper_is_kept() {
        let out = compress(
            "function transformBulk(ctx, aspects, subjects, res) { return outer(subjects); ;function outer(list) { return list.map(inner); };function inner(item) { return item.name + 'DEEP_MARKER'; }}",
        );
        assert!(out.contains("DEEP_MARKER"), "{}", out);
    }

    #[test]
    fn test_prune_follows_references() {
        let pruned = prune_unused_helpers(
            "function t(){return a();function a(){return b()};function b(){return 1};function c(){return 2};function d(){return d()}}",
        )
        .unwrap();
        assert_eq!(
            pruned,
            "function t(){return a();function a(){return b()};function b(){return 1};;}"
        );
    }

    #[test]
    fn test_prune_keeps_helper_referenced_from_nested_code() {
        let source = "function t(){return [1].map(function(){ return h(); });function h(){return 1}}";
        assert_eq!(prune_unused_helpers(source).unwrap(), source);
    }

    #[test]
    fn test_more_than_one_declaration_is_rejected() {
        let err = OxcCompressor
            .compress("function a(){} function b(){}", &RESERVED_NAMES)
            .unwrap_err();
        assert!(matches!(err, CompileError::Compression(_)));
        assert_eq!(err.code(), "SGT-ERR-COMPRESS");
    }

    #[test]
    fn test_destructured_params_are_rejected() {
        assert!(OxcCompressor
            .compress("function f({ ctx }) { return ctx; }", &RESERVED_NAMES)
            .is_err());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // BODY EXTRACTION
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_extract_body() {
        assert_eq!(
            extract_body("function transformBulk(ctx,aspects,subjects,res){return subjects.length}")
                .unwrap(),
            "return subjects.length"
        );
    }

    #[test]
    fn test_extract_body_with_nested_braces() {
        assert_eq!(
            extract_body("function f(a){if(a){return{b:'}'}}return a}").unwrap(),
            "if(a){return{b:'}'}}return a"
        );
    }

    #[test]
    fn test_extract_empty_body() {
        assert_eq!(extract_body("function f(){}").unwrap(), "");
    }

    #[test]
    fn test_extract_rejects_non_declarations() {
        assert!(extract_body("return 1").is_err());
        assert!(extract_body("const f = function(){}").is_err());
    }
}

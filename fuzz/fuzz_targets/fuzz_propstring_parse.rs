#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Property 1: parse never panics on arbitrary UTF-8 input.
    let Ok(parsed) = pbsctl_propstring::parse(s) else {
        return;
    };

    // Property 2: format never panics on anything parse can produce.
    let formatted = pbsctl_propstring::format(&parsed);

    // Property 3: format(parse(s)) is stable under one more parse/format round.
    let Ok(reparsed) = pbsctl_propstring::parse(&formatted) else {
        panic!("canonical output failed to reparse: {formatted:?}");
    };
    let reformatted = pbsctl_propstring::format(&reparsed);
    assert_eq!(formatted, reformatted, "canonicalization is not idempotent");
});

mod common;

use common::*;
use navpath::compile;
use navpath::simple_node::DocNavigator;
use rstest::rstest;

fn eval_err(tree: &navpath::simple_node::DocNode, expr: &str) -> navpath::Error {
    let compiled = compile::<DocNavigator>(expr).expect("should compile");
    match compiled.evaluate(&tree.navigator()) {
        Err(err) => err,
        Ok(navpath::Value::Nodes(mut iter)) => loop {
            match iter.move_next() {
                Err(err) => break err,
                Ok(true) => continue,
                Ok(false) => panic!("{expr:?}: expected an evaluation error"),
            }
        },
        Ok(other) => panic!("{expr:?}: expected an error, got {other:?}"),
    }
}

#[rstest]
fn func_boolean() {
    let empty = empty_doc();
    assert!(eval_bool(&empty, "true()"));
    assert!(!eval_bool(&empty, "false()"));
    assert!(!eval_bool(&empty, "boolean(0)"));
    // `null` and `true` here are element names, not keywords
    assert!(!eval_bool(&empty, "boolean(null)"));
    assert!(!eval_bool(&empty, "boolean(true)"));
    assert!(eval_bool(&empty, "boolean(1)"));
    assert!(eval_bool(&empty, "boolean(2)"));
    assert!(!eval_bool(&empty, "boolean(1 > 2)"));
    assert!(eval_bool(&bookstore(), "boolean(//*[@lang])"));
    assert!(!eval_bool(&bookstore(), "boolean(//*[@x])"));
}

#[rstest]
fn func_not() {
    assert_eq!(
        select_attrs(&empinfo(), "//employee[not(@id = \"1\")]", "id"),
        ["2", "3"]
    );
    assert_eq!(
        select_values(&bookstore(), "//book[not(year = 2005)]/title"),
        ["XQuery Kick Start", "Learning XML"]
    );
}

#[rstest]
fn func_name_and_local_name() {
    let html = html_page();
    assert_eq!(eval_string(&html, "name(//html/@lang)"), "lang");
    assert_eq!(eval_string(&html, "name(html/head/title)"), "title");
    assert_eq!(select_count(&html, "//*[name() = \"li\"]"), 3);
    assert_eq!(eval_string(&bookstore(), "local-name(bookstore)"), "bookstore");
    assert_eq!(eval_string(&mybooks(), "local-name(//mybook:book)"), "book");
    assert_eq!(eval_string(&mybooks(), "name(//mybook:book)"), "mybook:book");
}

#[rstest]
fn func_namespace_uri() {
    assert_eq!(eval_string(&mybooks(), "namespace-uri(//mybook:book)"), MYBOOK_NS);
    assert_eq!(
        select_attrs(
            &mybooks(),
            &format!("//*[namespace-uri()='{MYBOOK_NS}']"),
            "id"
        ),
        ["bk101", "bk102"]
    );
}

#[rstest]
fn func_count() {
    assert_eq!(eval_number(&bookstore(), "count(//book)"), 4.0);
    assert_eq!(eval_number(&bookstore(), "count(//book[3]/author)"), 5.0);
    assert_eq!(eval_number(&empty_doc(), "count(//missing)"), 0.0);
}

#[rstest]
fn func_sum() {
    let store = bookstore();
    assert_eq!(eval_number(&store, "sum(1 + 2)"), 3.0);
    assert!((eval_number(&store, "sum(//price)") - 149.93).abs() < 1e-9);
    assert!((eval_number(&store, "sum(//book/price)") - 149.93).abs() < 1e-9);
    assert_eq!(
        select_values(&store, "//book[sum(./price) > 40]/title"),
        ["XQuery Kick Start"]
    );
    let err = eval_err(&store, "sum('Hello')");
    assert_eq!(err.kind, navpath::ErrorKind::Eval);
}

#[rstest]
fn func_ceiling_floor_round() {
    let empty = empty_doc();
    assert_eq!(eval_number(&empty, "ceiling(5.2)"), 6.0);
    assert_eq!(eval_number(&empty, "floor(5.2)"), 5.0);
    assert_eq!(eval_number(&empty, "round(2.5)"), 3.0);
    assert_eq!(eval_number(&empty, "round(2.4999)"), 2.0);
}

#[rstest]
fn func_concat() {
    assert_eq!(eval_string(&empty_doc(), "concat(\"1\", \"2\", \"3\")"), "123");
    assert_eq!(
        eval_string(
            &bookstore(),
            "concat(//book[1]/title, \", \", //book[1]/year)"
        ),
        "Everyday Italian, 2005"
    );
}

#[rstest]
fn func_contains_starts_ends() {
    let empty = empty_doc();
    assert!(eval_bool(&empty, "contains(\"tattoo\", \"t\")"));
    assert!(!eval_bool(&empty, "contains(\"tattoo\", \"T\")"));
    assert!(!eval_bool(&empty, "contains(\"tattoo\", \"ttt\")"));
    assert_eq!(
        select_values(&bookstore(), "//book[contains(title, \"Potter\")]/title"),
        ["Harry Potter"]
    );
    assert_eq!(
        select_values(&bookstore(), "//book[contains(year, \"2005\")]/year"),
        ["2005", "2005"]
    );

    assert!(eval_bool(&empty, "starts-with(\"tattoo\", \"tat\")"));
    assert!(!eval_bool(&empty, "starts-with(\"tattoo\", \"att\")"));
    assert_eq!(
        select_values(&bookstore(), "//book[starts-with(title,'Everyday')]/title"),
        ["Everyday Italian"]
    );

    assert!(eval_bool(&empty, "ends-with(\"tattoo\", \"tattoo\")"));
    assert!(!eval_bool(&empty, "ends-with(\"tattoo\", \"atto\")"));
    assert_eq!(
        select_attrs(&bookstore(), "//book[ends-with(@category,'ing')]", "category"),
        ["cooking"]
    );
    assert_eq!(
        select_values(&bookstore(), "//book[ends-with(./price,'.99')]/price"),
        ["29.99", "49.99"]
    );
}

#[rstest]
#[case("//*[contains(0, 0)]")]
#[case("//*[starts-with(0, 0)]")]
#[case("//*[starts-with(name(), 0)]")]
#[case("//*[ends-with(0, 0)]")]
#[case("//*[matches(@href, 0)]")]
fn strict_string_functions_reject_numbers(#[case] expr: &str) {
    let err = eval_err(&html_page(), expr);
    assert_eq!(err.kind, navpath::ErrorKind::Eval, "{expr}");
}

#[rstest]
fn func_string() {
    let empty = empty_doc();
    assert_eq!(eval_string(&empty, "string(1.23)"), "1.23");
    assert_eq!(eval_string(&empty, "string(3)"), "3");
    assert_eq!(eval_string(&bookstore(), "string(//book/@category)"), "cooking");
}

#[rstest]
fn func_string_join() {
    assert_eq!(
        eval_string(&empty_doc(), "string-join(\"some text\", \";\")"),
        "some text"
    );
    assert_eq!(
        eval_string(&bookstore(), "string-join(//book/@category, \";\")"),
        "cooking;children;web;web"
    );
}

#[rstest]
fn func_string_length() {
    let empty = empty_doc();
    assert_eq!(
        eval_number(
            &empty,
            "string-length(\"Harp not on that string, madam; that is past.\")"
        ),
        45.0
    );
    assert_eq!(eval_number(&empty, "string-length(normalize-space(' abc '))"), 3.0);
    assert_eq!(eval_number(&html_page(), "string-length(//title/text())"), 7.0);
    assert_eq!(eval_number(&html_page(), "string-length(//html/@lang)"), 2.0);
    assert_eq!(
        select_count(&empinfo(), "//employee[string-length(@id) > 0]"),
        3
    );
}

#[rstest]
fn func_substring() {
    let empty = empty_doc();
    assert_eq!(eval_string(&empty, "substring(\"motor car\", 6)"), " car");
    assert_eq!(eval_string(&empty, "substring(\"metadata\", 4, 3)"), "ada");
    assert_eq!(eval_string(&empty, "substring(\"12345\", 5, -3)"), "");
    assert_eq!(eval_string(&empty, "substring(\"12345\", 1.5, 2.6)"), "234");
    assert_eq!(eval_string(&empty, "substring(\"12345\", 0, 3)"), "12");
    assert_eq!(eval_string(&empty, "substring(\"12345\", 0, 5)"), "1234");
    assert_eq!(eval_string(&empty, "substring(\"12345\", 1, 5)"), "12345");
    assert_eq!(eval_string(&empty, "substring(\"12345\", 1, 6)"), "12345");
    assert_eq!(
        eval_string(&html_page(), "substring(//title/child::node(), 1)"),
        "My page"
    );
}

#[rstest]
fn func_substring_before_after() {
    let empty = empty_doc();
    assert_eq!(eval_string(&empty, "substring-after(\"tattoo\", \"tat\")"), "too");
    assert_eq!(eval_string(&empty, "substring-after(\"tattoo\", \"tattoo\")"), "");
    assert_eq!(eval_string(&empty, "substring-before(\"tattoo\", \"attoo\")"), "t");
    assert_eq!(eval_string(&empty, "substring-before(\"tattoo\", \"tatto\")"), "");
}

#[rstest]
fn func_translate() {
    let empty = empty_doc();
    assert_eq!(eval_string(&empty, "translate(\"bar\",\"abc\",\"ABC\")"), "BAr");
    assert_eq!(eval_string(&empty, "translate(\"--aaa--\",\"abc-\",\"ABC\")"), "AAA");
    assert_eq!(eval_string(&empty, "translate(\"abcdabc\", \"abc\", \"AB\")"), "ABdAB");
    assert_eq!(
        eval_string(&empty, "translate('The quick brown fox', 'brown', 'red')"),
        "The quick red fdx"
    );
}

#[rstest]
fn func_lower_case() {
    assert_eq!(eval_string(&empty_doc(), "lower-case(\"ABc!D\")"), "abc!d");
    assert_eq!(select_count(&empinfo(), "//name[@from=\"ca\"]"), 0);
    assert_eq!(
        select_values(&empinfo(), "//name[lower-case(@from) = \"ca\"]"),
        ["Max Miller"]
    );
}

#[rstest]
fn func_matches() {
    let empty = empty_doc();
    assert!(eval_bool(&empty, "matches(\"abracadabra\", \"bra\")"));
    assert!(eval_bool(&empty, "matches(\"abracadabra\", \"(?i)^A.*A$\")"));
    assert!(eval_bool(&empty, "matches(\"abracadabra\", \"^a.*a$\")"));
    assert!(!eval_bool(&empty, "matches(\"abracadabra\", \"^bra\")"));
}

#[rstest]
fn matches_invalid_literal_pattern_fails_at_compile() {
    let err = compile::<DocNavigator>("//*[matches(@href, '[invalid')]").unwrap_err();
    assert_eq!(err.kind, navpath::ErrorKind::Build);
    assert!(compile::<DocNavigator>("//*[matches()]").is_err());
}

#[rstest]
fn matches_dynamic_pattern_fails_at_evaluation() {
    let err = eval_err(&html_page(), "//*[matches(name(), concat('[', 'bad'))]");
    assert_eq!(err.kind, navpath::ErrorKind::Eval);
}

#[rstest]
fn func_replace() {
    let empty = empty_doc();
    assert_eq!(eval_string(&empty, "replace('aa-bb-cc','bb','ee')"), "aa-ee-cc");
    assert_eq!(
        eval_string(&empty, "replace(\"abracadabra\", \"bra\", \"*\")"),
        "a*cada*"
    );
    assert_eq!(eval_string(&empty, "replace(\"abracadabra\", \"a\", \"\")"), "brcdbr");
    assert_eq!(eval_string(&empty, "replace(\"abracadabra\", \"a.*a\", \"*\")"), "*");
    assert_eq!(
        eval_string(&empty, "replace(\"abracadabra\", \"a.*?a\", \"*\")"),
        "*c*bra"
    );
    assert_eq!(eval_string(&empty, "replace(\"AAAA\", \"A+\", \"b\")"), "b");
    assert_eq!(eval_string(&empty, "replace(\"AAAA\", \"A+?\", \"b\")"), "bbbb");
    assert_eq!(
        eval_string(&empty, "replace(\"darted\", \"^(.*?)d(.*)$\", \"$1c$2\")"),
        "carted"
    );
    assert_eq!(
        eval_string(&empty, "replace(\"abracadabra\", \"a(.)\", \"a$1$1\")"),
        "abbraccaddabbra"
    );
    assert_eq!(
        eval_string(&empty, "replace(\"1/1/c11/1\", \"(.*)/[^/]+$\", \"$1\")"),
        "1/1/c11"
    );
}

#[rstest]
fn func_number() {
    let empty = empty_doc();
    assert_eq!(eval_number(&empty, "number(10)"), 10.0);
    assert_eq!(eval_number(&empty, "number(1.11)"), 1.11);
    assert!(!eval_bool(&empty, "number(\"10\") > 10"));
    assert!(eval_bool(&empty, "number(\"10\") = 10"));
    assert!(eval_bool(&empty, "number(\"123\") < 1000"));
    assert!(!eval_bool(&empty, "number(//non-existent-node) = 0"));
    assert!(eval_number(&empty, "number(//non-existent-node)").is_nan());
    assert!(eval_number(&empty, "number(\"123a\")").is_nan());
}

#[rstest]
fn func_position_over_books() {
    assert_eq!(
        select_values(&bookstore(), "//book[position() = 1]/title"),
        ["Everyday Italian"]
    );
    assert_eq!(
        select_values(&bookstore(), "//book[(position() mod 2) = 0]/title"),
        ["Harry Potter", "Learning XML"]
    );
    assert_eq!(
        select_values(&bookstore(), "//book[position() = last()]/title"),
        ["Learning XML"]
    );
}

#[rstest]
fn func_reverse() {
    assert_eq!(
        select_attrs(&empinfo(), "reverse(//employee)", "id"),
        ["3", "2", "1"]
    );
    assert_eq!(
        select_count(&empinfo(), "//employee[reverse(.) = reverse(.)]"),
        3
    );
    let err = compile::<DocNavigator>("reverse(concat('a', 'b'))").unwrap_err();
    assert_eq!(err.kind, navpath::ErrorKind::Build);
    assert!(compile::<DocNavigator>("reverse()").is_err());
}

#[rstest]
fn func_normalize_space() {
    let empty = empty_doc();
    assert_eq!(
        eval_string(
            &empty,
            "normalize-space(\"\t    \rloooooooonnnnnnngggggggg  \r \n tes  \u{00a0} t strin \n\n \r g \")"
        ),
        "loooooooonnnnnnngggggggg tes t strin g"
    );
    assert_eq!(eval_string(&empty, "normalize-space(' abc ')"), "abc");
    assert_eq!(eval_string(&empty, "normalize-space(\"  a\u{00a0} b \")"), "a b");
    assert_eq!(
        eval_string(&bookstore(), "normalize-space(//book/title)"),
        "Everyday Italian"
    );
    assert_eq!(
        eval_string(&bookstore(), "normalize-space(//book[1]/title)"),
        "Everyday Italian"
    );

    // zero-argument form works on the context node
    let name = &select_nodes(&empinfo(), "//employee[@id=\"1\"]/name")[0];
    let expr = compile::<DocNavigator>("normalize-space()").unwrap();
    match expr.evaluate(name).unwrap() {
        navpath::Value::Text(s) => assert_eq!(s, "Opal Kole"),
        other => panic!("expected text, got {other:?}"),
    }
    let expr = compile::<DocNavigator>("normalize-space(.)").unwrap();
    match expr.evaluate(name).unwrap() {
        navpath::Value::Text(s) => assert_eq!(s, "Opal Kole"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[rstest]
fn func_lang_is_recognised_and_false() {
    assert!(!eval_bool(&html_page(), "lang('en')"));
}

#[rstest]
fn unknown_function_fails_to_compile() {
    let err = compile::<DocNavigator>("frobnicate(1)").unwrap_err();
    assert_eq!(err.kind, navpath::ErrorKind::Build);
    assert!(err.message.contains("frobnicate"));
}

#[rstest]
fn wrong_arity_fails_to_compile() {
    assert!(compile::<DocNavigator>("count()").is_err());
    assert!(compile::<DocNavigator>("substring('x')").is_err());
    assert!(compile::<DocNavigator>("concat('only')").is_err());
    assert!(compile::<DocNavigator>("translate('a', 'b')").is_err());
    assert!(compile::<DocNavigator>("true(1)").is_err());
}

mod common;

use common::*;
use navpath::Navigator;
use rstest::rstest;

#[rstest]
fn self_axis() {
    assert_eq!(select_names(&empinfo(), "//name/self::*"), ["name"; 3]);
    assert_eq!(
        select_values(&empinfo(), "//name/self::*"),
        ["Opal Kole", "Max Miller", "Beccaa Moss"]
    );
}

#[rstest]
fn child_axis() {
    assert_eq!(select_names(&empinfo(), "/empinfo/child::*"), ["employee"; 3]);
    assert_eq!(
        select_names(&empinfo(), "/empinfo/child::node()"),
        ["employee"; 3]
    );
    assert_eq!(
        select_values(&empinfo(), "//name/child::text()"),
        ["Opal Kole", "Max Miller", "Beccaa Moss"]
    );
    assert_eq!(
        select_count(&empinfo(), "//child::employee/child::email"),
        3
    );
}

#[rstest]
fn descendant_axis() {
    assert_eq!(
        select_names(&empinfo(), "//employee/descendant::*"),
        ["name", "designation", "email", "name", "designation", "email", "name", "designation", "email"]
    );
    assert_eq!(select_count(&empinfo(), "//descendant::employee"), 3);
    // descendant:: does not include the context node itself
    assert_eq!(select_count(&empinfo(), "/empinfo/descendant::empinfo"), 0);
}

#[rstest]
fn descendant_or_self_axis() {
    assert_eq!(
        select_names(&empinfo(), "//employee/descendant-or-self::*"),
        [
            "employee", "name", "designation", "email", //
            "employee", "name", "designation", "email", //
            "employee", "name", "designation", "email",
        ]
    );
    assert_eq!(select_count(&empinfo(), "//descendant-or-self::employee"), 3);
}

#[rstest]
fn ancestor_axis() {
    assert_eq!(select_names(&empinfo(), "//employee/ancestor::*"), ["empinfo"]);
    assert_eq!(
        select_names(&empinfo(), "//employee/ancestor::empinfo"),
        ["empinfo"]
    );
    // grandparent chains climb all the way up
    assert_eq!(
        select_names(&empinfo(), "//name/ancestor::*"),
        ["employee", "empinfo", "employee", "employee"]
    );
}

#[rstest]
fn ancestor_or_self_axis() {
    // first-seen order: employee1, its ancestor, then the other employees
    assert_eq!(
        select_names(&empinfo(), "//employee/ancestor-or-self::*"),
        ["employee", "empinfo", "employee", "employee"]
    );
    assert_eq!(
        select_count(&empinfo(), "//name/ancestor-or-self::employee"),
        3
    );
}

#[rstest]
fn parent_axis() {
    assert_eq!(select_names(&empinfo(), "//name/parent::*"), ["employee"; 3]);
    assert_eq!(
        select_names(&empinfo(), "//name/parent::employee"),
        ["employee"; 3]
    );
    assert_eq!(select_names(&bookstore(), "//book[@category=\"cooking\"]/.."), ["bookstore"]);
}

#[rstest]
fn attribute_axis() {
    assert_eq!(select_values(&empinfo(), "//attribute::id"), ["1", "2", "3"]);
    assert_eq!(select_count(&empinfo(), "//attribute::*"), 9);
    assert_eq!(select_values(&empinfo(), "//name/@from"), ["CA"]);
}

#[rstest]
fn following_axis() {
    assert_eq!(
        select_names(&empinfo(), "//employee[@id=1]/following::*"),
        [
            "employee", "name", "designation", "email", //
            "employee", "name", "designation", "email",
        ]
    );
    let values = select_values(&empinfo(), "//employee[@id=1]/following::name");
    assert_eq!(values, ["Max Miller", "Beccaa Moss"]);
}

#[rstest]
fn following_sibling_axis() {
    let siblings = select_nodes(&empinfo(), "//employee[@id=1]/following-sibling::*");
    assert_eq!(
        siblings.iter().map(|n| attr_of(n, "id").unwrap()).collect::<Vec<_>>(),
        ["2", "3"]
    );
    assert_eq!(
        select_count(&empinfo(), "//employee[@id=1]/following-sibling::employee"),
        2
    );
}

#[rstest]
fn preceding_axis() {
    // subtrees in reverse document order, each traversed forward
    assert_eq!(
        select_names(&empinfo(), "//employee[@id=3]/preceding::*"),
        [
            "employee", "name", "designation", "email", //
            "employee", "name", "designation", "email",
        ]
    );
    let values = select_values(&empinfo(), "//employee[@id=3]/preceding::name");
    assert_eq!(values, ["Max Miller", "Opal Kole"]);
}

#[rstest]
fn preceding_sibling_axis() {
    let siblings = select_nodes(&empinfo(), "//employee[@id=3]/preceding-sibling::*");
    assert_eq!(
        siblings.iter().map(|n| attr_of(n, "id").unwrap()).collect::<Vec<_>>(),
        ["2", "1"]
    );
}

#[rstest]
fn namespace_axis_is_empty() {
    assert_eq!(select_count(&mybooks(), "//namespace::*"), 0);
}

#[rstest]
fn comment_node_test() {
    assert_eq!(
        select_values(&html_page(), "//body/comment()"),
        [" this is the end "]
    );
}

#[rstest]
fn text_node_test_under_double_slash() {
    // //text() selects text nodes only
    let values = select_values(&html_page(), "//title/text()");
    assert_eq!(values, ["My page"]);
    assert!(
        select_nodes(&html_page(), "//text()")
            .iter()
            .all(|n| n.local_name().is_empty())
    );
}

#[rstest]
fn axis_complement_round_trip() {
    // for every non-root node N, N/parent::*/child::* contains N
    let names = select_names(&empinfo(), "//name/parent::*/child::name");
    assert_eq!(names.len(), 3);
}

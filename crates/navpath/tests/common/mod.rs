//! Shared fixture trees and assertion helpers. The documents reproduce the
//! ones the engine's behavior is calibrated against: a bookstore, an
//! employee roster, a small HTML page and a namespaced book catalogue.

#![allow(dead_code)]

use navpath::simple_node::{DocNavigator, DocNode, comment_node, doc, elem, elem_ns, text_node};
use navpath::{Navigator, Value, compile};

/// ```xml
/// <bookstore>
///   <book category="cooking"><title lang="en">Everyday Italian</title>...
///   <book category="children"><title lang="en">Harry Potter</title>...
///   <book category="web"><title lang="en">XQuery Kick Start</title>...
///   <book category="web"><title lang="en">Learning XML</title>...
/// </bookstore>
/// ```
pub fn bookstore() -> DocNode {
    struct Book {
        category: &'static str,
        title: &'static str,
        authors: &'static [&'static str],
        year: &'static str,
        price: &'static str,
    }
    let books = [
        Book {
            category: "cooking",
            title: "Everyday Italian",
            authors: &["Giada De Laurentiis"],
            year: "2005",
            price: "30.00",
        },
        Book {
            category: "children",
            title: "Harry Potter",
            authors: &["J K. Rowling"],
            year: "2005",
            price: "29.99",
        },
        Book {
            category: "web",
            title: "XQuery Kick Start",
            authors: &[
                "James McGovern",
                "Per Bothner",
                "Kurt Cagle",
                "James Linn",
                "Vaidyanathan Nagarajan",
            ],
            year: "2003",
            price: "49.99",
        },
        Book {
            category: "web",
            title: "Learning XML",
            authors: &["Erik T. Ray"],
            year: "2003",
            price: "39.95",
        },
    ];

    let mut store = elem("bookstore");
    for book in &books {
        let mut b = elem("book").attr("category", book.category);
        b = b.child(
            elem("title")
                .attr("lang", "en")
                .child(text_node(book.title)),
        );
        for author in book.authors {
            b = b.child(elem("author").child(text_node(author)));
        }
        b = b.child(elem("year").child(text_node(book.year)));
        b = b.child(elem("price").child(text_node(book.price)));
        store = store.child(b);
    }
    doc().child(store).build()
}

/// ```xml
/// <empinfo>
///   <employee id="1"><name>Opal Kole</name>
///     <designation discipline="web" experience="3 year">Senior Engineer</designation>
///     <email>OpalKole@myemail.com</email></employee>
///   <employee id="2"><name from="CA">Max Miller</name>...
///   <employee id="3"><name>Beccaa Moss</name>...
/// </empinfo>
/// ```
pub fn empinfo() -> DocNode {
    doc()
        .child(
            elem("empinfo")
                .child(
                    elem("employee")
                        .attr("id", "1")
                        .child(elem("name").child(text_node("Opal Kole")))
                        .child(
                            elem("designation")
                                .attr("discipline", "web")
                                .attr("experience", "3 year")
                                .child(text_node("Senior Engineer")),
                        )
                        .child(elem("email").child(text_node("OpalKole@myemail.com"))),
                )
                .child(
                    elem("employee")
                        .attr("id", "2")
                        .child(
                            elem("name")
                                .attr("from", "CA")
                                .child(text_node("Max Miller")),
                        )
                        .child(
                            elem("designation")
                                .attr("discipline", "DBA")
                                .attr("experience", "2 year")
                                .child(text_node("DBA Engineer")),
                        )
                        .child(elem("email").child(text_node("maxmiller@email.com"))),
                )
                .child(
                    elem("employee")
                        .attr("id", "3")
                        .child(elem("name").child(text_node("Beccaa Moss")))
                        .child(
                            elem("designation")
                                .attr("discipline", "appdev")
                                .child(text_node("Application Developer")),
                        )
                        .child(elem("email").child(text_node("beccaamoss@email.com"))),
                ),
        )
        .build()
}

/// The small HTML page: head/title, a list of three links, a paragraph and
/// a trailing comment.
pub fn html_page() -> DocNode {
    doc()
        .child(
            elem("html")
                .attr("lang", "en")
                .child(
                    elem("head")
                        .child(elem("title").child(text_node("My page")))
                        .child(elem("meta").attr("name", "language").attr("content", "en")),
                )
                .child(
                    elem("body")
                        .child(elem("h2").child(text_node("Welcome to my page")))
                        .child(
                            elem("ul")
                                .child(
                                    elem("li").child(
                                        elem("a").attr("href", "/").child(text_node("Home")),
                                    ),
                                )
                                .child(
                                    elem("li").child(
                                        elem("a")
                                            .attr("href", "/About")
                                            .child(text_node("About")),
                                    ),
                                )
                                .child(
                                    elem("li").child(
                                        elem("a")
                                            .attr("href", "/account")
                                            .child(text_node("Login")),
                                    ),
                                ),
                        )
                        .child(elem("p").child(text_node("This is the first paragraph.")))
                        .child(comment_node(" this is the end ")),
                ),
        )
        .build()
}

pub const MYBOOK_NS: &str = "http://www.contoso.com/books";

/// Namespaced catalogue: `<books>` holding two `<mybook:book>` elements.
pub fn mybooks() -> DocNode {
    let book = |id: &str, title: &str, author: &str, price: &str, published: &str| {
        elem_ns("mybook", MYBOOK_NS, "book")
            .attr("id", id)
            .child(elem("title").child(text_node(title)))
            .child(elem("author").child(text_node(author)))
            .child(elem("price").child(text_node(price)))
            .child(elem("publish_date").child(text_node(published)))
    };
    doc()
        .child(
            elem("books")
                .child(book(
                    "bk101",
                    "XML Developer's Guide",
                    "Gambardella, Matthew",
                    "44.95",
                    "2000-10-01",
                ))
                .child(book(
                    "bk102",
                    "Midnight Rain",
                    "Ralls, Kim",
                    "5.95",
                    "2000-12-16",
                )),
        )
        .build()
}

/// Empty document: just a root node.
pub fn empty_doc() -> DocNode {
    doc().build()
}

pub fn select_nodes(tree: &DocNode, expr: &str) -> Vec<DocNavigator> {
    compile(expr)
        .unwrap_or_else(|err| panic!("compile {expr:?}: {err}"))
        .select(&tree.navigator())
        .collect_nodes()
        .unwrap_or_else(|err| panic!("select {expr:?}: {err}"))
}

/// String values of all selected nodes.
pub fn select_values(tree: &DocNode, expr: &str) -> Vec<String> {
    select_nodes(tree, expr).iter().map(|n| n.value()).collect()
}

/// Local names of all selected nodes.
pub fn select_names(tree: &DocNode, expr: &str) -> Vec<String> {
    select_nodes(tree, expr)
        .iter()
        .map(|n| n.local_name())
        .collect()
}

pub fn select_count(tree: &DocNode, expr: &str) -> usize {
    select_nodes(tree, expr).len()
}

pub fn eval(tree: &DocNode, expr: &str) -> Value<DocNavigator> {
    compile(expr)
        .unwrap_or_else(|err| panic!("compile {expr:?}: {err}"))
        .evaluate(&tree.navigator())
        .unwrap_or_else(|err| panic!("evaluate {expr:?}: {err}"))
}

pub fn eval_number(tree: &DocNode, expr: &str) -> f64 {
    match eval(tree, expr) {
        Value::Number(n) => n,
        other => panic!("{expr:?}: expected a number, got {other:?}"),
    }
}

pub fn eval_string(tree: &DocNode, expr: &str) -> String {
    match eval(tree, expr) {
        Value::Text(s) => s,
        other => panic!("{expr:?}: expected a string, got {other:?}"),
    }
}

pub fn eval_bool(tree: &DocNode, expr: &str) -> bool {
    match eval(tree, expr) {
        Value::Bool(b) => b,
        other => panic!("{expr:?}: expected a boolean, got {other:?}"),
    }
}

/// Value of the named attribute of the node under `nav`, if present.
pub fn attr_of(nav: &DocNavigator, name: &str) -> Option<String> {
    let mut cursor = nav.clone();
    while cursor.move_to_next_attribute() {
        if cursor.local_name() == name {
            return Some(cursor.value());
        }
    }
    None
}

/// Values of the named attribute across all selected nodes ("" when absent).
pub fn select_attrs(tree: &DocNode, expr: &str, name: &str) -> Vec<String> {
    select_nodes(tree, expr)
        .iter()
        .map(|n| attr_of(n, name).unwrap_or_default())
        .collect()
}

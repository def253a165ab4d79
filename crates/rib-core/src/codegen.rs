//! Static HTML generated from the design tree.
//!
//! Each widget type carries a template. Three placeholders are expanded:
//! `%UID%` (the node uid), `%PROP(name)%` (the escaped property value) and
//! `%ZONE(name)%` (the rendered children of that zone). Anything else is
//! copied through untouched. Types without a template render their zones
//! back to back.

use std::fmt::Write as _;

use crate::node::Uid;
use crate::tree::DesignTree;

enum Placeholder<'t> {
    Uid,
    Prop(&'t str),
    Zone(&'t str),
}

/// Parse a placeholder body (the text between two `%`).
fn placeholder(body: &str) -> Option<Placeholder<'_>> {
    if body == "UID" {
        return Some(Placeholder::Uid);
    }
    let arg = |prefix: &str| {
        body.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(')'))
            .filter(|name| !name.is_empty())
    };
    arg("PROP(")
        .map(Placeholder::Prop)
        .or_else(|| arg("ZONE(").map(Placeholder::Zone))
}

fn render_zone(tree: &DesignTree, uid: Uid, zone: &str, out: &mut String) {
    let Some(node) = tree.node(uid) else {
        return;
    };
    for child in node.children_in(zone) {
        render_node(tree, *child, out);
    }
}

fn render_node(tree: &DesignTree, uid: Uid, out: &mut String) {
    let Some(node) = tree.node(uid) else {
        return;
    };
    let template = match tree.registry().template(node.widget_type()) {
        Ok(Some(template)) => template,
        Ok(None) => {
            for slot in node.zones() {
                render_zone(tree, uid, &slot.name, out);
            }
            return;
        }
        Err(error) => {
            tracing::warn!(%uid, %error, "no template for node");
            return;
        }
    };

    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let parsed = after
            .find('%')
            .and_then(|end| placeholder(&after[..end]).map(|p| (p, end)));
        let Some((placeholder, end)) = parsed else {
            out.push('%');
            rest = after;
            continue;
        };
        match placeholder {
            Placeholder::Uid => {
                let _ = write!(out, "{uid}");
            }
            Placeholder::Prop(name) => match tree.property(uid, name) {
                Ok(value) => {
                    out.push_str(&html_escape::encode_quoted_attribute(&value.to_string()));
                }
                Err(error) => tracing::debug!(%uid, property = name, %error, "template property"),
            },
            Placeholder::Zone(zone) => render_zone(tree, uid, zone, out),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
}

/// Markup of one node and its subtree.
pub fn render_subtree(tree: &DesignTree, uid: Uid) -> String {
    let mut out = String::new();
    render_node(tree, uid, &mut out);
    out
}

/// Markup of one page, as shown on the design canvas.
pub fn render_page(tree: &DesignTree, page: Uid) -> Option<String> {
    tree.is_page(page).then(|| render_subtree(tree, page))
}

/// A standalone HTML document with every page, titled by the design.
pub fn render_document(tree: &DesignTree) -> String {
    let title = tree
        .property(tree.root(), "title")
        .map(|v| v.to_string())
        .unwrap_or_default();
    let theme = tree
        .property(tree.root(), "theme")
        .map(|v| v.to_string())
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", html_escape::encode_text(&title));
    out.push_str("</head>\n");
    let _ = writeln!(
        out,
        "<body data-theme=\"{}\">",
        html_escape::encode_quoted_attribute(&theme)
    );
    for page in tree.pages() {
        render_node(tree, *page, &mut out);
        out.push('\n');
    }
    out.push_str("</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::registry::WidgetRegistry;
    use crate::tree::PAGE_TYPE;

    #[test]
    fn test_placeholder_parsing() {
        assert!(matches!(placeholder("UID"), Some(Placeholder::Uid)));
        assert!(matches!(placeholder("PROP(text)"), Some(Placeholder::Prop("text"))));
        assert!(matches!(placeholder("ZONE(top)"), Some(Placeholder::Zone("top"))));
        assert!(placeholder("PROP()").is_none());
        assert!(placeholder("50").is_none());
    }

    #[test]
    fn test_render_document() {
        let registry = Rc::new(
            WidgetRegistry::from_json(
                r#"{
                    "Design": { "template": "%ZONE(default)%", "zones": [ { "name": "default", "cardinality": "N" } ],
                                "properties": { "title": { "type": "string", "default": "Demo & Co" },
                                                "theme": { "type": "string", "default": "a" } } },
                    "Page": { "template": "<div id=\"%UID%\">%ZONE(body)%</div>",
                              "zones": [ { "name": "body", "cardinality": "N" } ] },
                    "Text": { "template": "<p class=\"w-100%\">%PROP(text)%</p>",
                              "properties": { "text": { "type": "string", "default": "" } } }
                }"#,
            )
            .unwrap(),
        );
        let mut tree = DesignTree::new(registry).unwrap();
        let page = tree.create_node(PAGE_TYPE, false).unwrap();
        tree.add_child(tree.root(), page, None, None).unwrap();
        let text = tree.create_node("Text", false).unwrap();
        tree.add_child(page, text, None, None).unwrap();
        tree.set_property(text, "text", Some("<b>\"hi\"</b>".into())).unwrap();

        let html = render_document(&tree).replace(&format!("id=\"{page}\""), "id=\"PAGE\"");
        insta::assert_snapshot!(html, @r#"
        <!DOCTYPE html>
        <html>
        <head>
        <meta charset="utf-8">
        <title>Demo &amp; Co</title>
        </head>
        <body data-theme="a">
        <div id="PAGE"><p class="w-100%">&lt;b&gt;&quot;hi&quot;&lt;/b&gt;</p></div>
        </body>
        </html>
        "#);
    }

    #[test]
    fn test_render_page_marks_uids() {
        let mut tree = DesignTree::new(Rc::new(WidgetRegistry::builtin())).unwrap();
        let page = tree.create_node(PAGE_TYPE, true).unwrap();
        tree.add_child(tree.root(), page, None, None).unwrap();
        let button = tree.create_node("Button", true).unwrap();
        tree.add_child(page, button, None, None).unwrap();

        let html = render_page(&tree, page).unwrap();
        assert!(html.contains(&format!("data-uid=\"{page}\"")));
        assert!(html.contains(&format!("data-uid=\"{button}\"")));
        assert!(html.contains(">Button</a>"));
        assert!(render_page(&tree, button).is_none());
    }
}

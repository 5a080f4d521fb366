use cardmark::query::{command_arg_at, extract_config_args, section_links};
use navigator::view::{InlineView, ViewNode};
use navigator::{Event, Navigator, NavigatorConfig, RenderModel, resolve};

const TRAVEL: &str = "\
# The beginning
Welcome aboard.

[Go to France](link \"france-entry\")

# france-entry
Bonjour!

! image \"https://example.com/paris.png\"

[Home](link \"The beginning\") or [Germany](link \"germany\")
";

fn navigator(source: &str) -> Navigator {
    Navigator::from_source(source, NavigatorConfig::default())
}

fn heading(model: &RenderModel) -> Option<&str> {
    model.heading.as_ref().map(|heading| heading.text.as_str())
}

fn targets(model: &RenderModel) -> Vec<&str> {
    model.links().iter().map(|link| link.target.as_str()).collect()
}

fn words(model: &RenderModel) -> Vec<String> {
    fn walk(node: &ViewNode, out: &mut Vec<String>) {
        match node {
            ViewNode::Paragraph(inlines) => {
                for inline in inlines {
                    match inline {
                        InlineView::Word { text, .. } => out.push(text.clone()),
                        InlineView::Link(link) => out.push(link.label.clone()),
                        InlineView::Diagnostic(_) | InlineView::Empty => {}
                    }
                }
            }
            ViewNode::Column(children)
            | ViewNode::Row(children)
            | ViewNode::ListItem { children, .. } => {
                children.iter().for_each(|child| walk(child, out))
            }
            ViewNode::Indented { child, .. } | ViewNode::Highlighted(child) => walk(child, out),
            _ => {}
        }
    }
    let mut out = Vec::new();
    model.body.iter().for_each(|node| walk(node, &mut out));
    out
}

#[test]
fn load_and_follow_link() {
    let mut nav = navigator(TRAVEL);
    let model = nav.render();
    assert_eq!(heading(&model), Some("The beginning"));
    assert_eq!(targets(&model), vec!["france-entry"]);

    nav.dispatch(model.links()[0].activate());
    let model = nav.render();
    assert_eq!(heading(&model), Some("france-entry"));
    assert!(model.body.contains(&ViewNode::Image {
        src: "https://example.com/paris.png".into(),
        height: 200,
    }));
}

#[test]
fn broken_link_shows_placeholder() {
    let mut nav = navigator(TRAVEL);
    nav.dispatch(Event::Navigate("france-entry".into()));
    let germany = nav
        .render()
        .links()
        .into_iter()
        .find(|link| link.label == "Germany")
        .cloned()
        .expect("germany link");

    nav.dispatch(germany.activate());
    assert!(nav.current_section().is_none());
    let model = nav.render();
    assert!(model.is_placeholder());
    assert!(model.links().is_empty());

    // The document survives a miss.
    nav.dispatch(Event::Navigate("The beginning".into()));
    assert_eq!(heading(&nav.render()), Some("The beginning"));
}

#[test]
fn malformed_block_renders_with_location() {
    let nav = navigator("# The beginning\nfine\n\n! image \"unterminated\n\nafter\n");
    let model = nav.render();
    let diagnostics = model.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].starts_with("parse error at line 4, column 9"));
    assert_eq!(words(&model), vec!["fine", "after"]);
}

#[test]
fn lookup_ignores_anonymous_sections() {
    let source = "# The beginning\nx\n\n#\nanonymous\n";
    let nav = navigator(source);
    assert_eq!(nav.document().sections.len(), 2);
    assert!(resolve(nav.document(), "4").is_none());
    assert!(resolve(nav.document(), "").is_none());
}

#[test]
fn navigation_is_deterministic() {
    let mut first = navigator(TRAVEL);
    let mut second = navigator(TRAVEL);
    for label in ["france-entry", "nowhere", "The beginning"] {
        first.dispatch(Event::Navigate(label.into()));
        second.dispatch(Event::Navigate(label.into()));
        assert_eq!(first.state(), second.state());
        assert_eq!(first.render(), second.render());
    }
}

#[test]
fn render_is_idempotent() {
    let mut nav = navigator(TRAVEL);
    nav.dispatch(Event::Navigate("france-entry".into()));
    assert_eq!(nav.render(), nav.render());
}

#[test]
fn every_link_becomes_one_clickable() {
    let nav = navigator(TRAVEL);
    for section in &nav.document().sections {
        let model = navigator::project(&nav.config().format, section);
        assert_eq!(targets(&model), section_links(section));
    }
}

#[test]
fn nested_layouts() {
    let source = "\
# The beginning
! row
> ! image \"a.png\"
> ! image \"b.png\"

! code
> let x = 1;
> let y = 2;

1. one
2. two
";
    let model = navigator(source).render();
    assert_eq!(
        model.body[0],
        ViewNode::Row(vec![
            ViewNode::Image {
                src: "a.png".into(),
                height: 200
            },
            ViewNode::Image {
                src: "b.png".into(),
                height: 200
            },
        ])
    );
    assert_eq!(
        model.body[1],
        ViewNode::Code(vec!["let x = 1;".into(), "let y = 2;".into()])
    );
    let ViewNode::Indented { child, .. } = &model.body[2] else {
        panic!("expected an indented list, got {:?}", model.body[2]);
    };
    let ViewNode::Column(items) = child.as_ref() else {
        panic!("expected a column");
    };
    let markers: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            ViewNode::ListItem { marker, .. } => marker.map(|m| m.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(markers, vec!["1.", "2."]);
}

#[test]
fn config_shapes_the_card() {
    let config: NavigatorConfig = toml::from_str(
        "default_label = \"Intro\"\n[format]\nimage_height = 50\nleft_padding = 4\n",
    )
    .unwrap();
    let nav = Navigator::from_source("# Intro\n! image \"x.png\"\n", config);
    let model = nav.render();
    assert_eq!(heading(&model), Some("Intro"));
    assert_eq!(model.layout.left_padding, 4);
    assert_eq!(
        model.body,
        vec![ViewNode::Image {
            src: "x.png".into(),
            height: 50
        }]
    );
}

#[test]
fn empty_arguments_are_absent() {
    assert!(extract_config_args(&[]).is_empty());
    assert_eq!(command_arg_at(&[], 0), "noArg");
    assert_eq!(command_arg_at(&[], 3), "noArg");
}

#[test]
fn link_inside_bold_is_followable() {
    let mut nav = navigator(
        "# The beginning\nSee **[France](link \"france-entry\")** now\n\n# france-entry\nhi\n",
    );
    let model = nav.render();
    assert_eq!(targets(&model), vec!["france-entry"]);

    nav.dispatch(model.links()[0].activate());
    assert_eq!(heading(&nav.render()), Some("france-entry"));
}

#[test]
fn image_line_after_text_renders() {
    let model = navigator("# The beginning\nLook here:\n! image \"x.png\"\n").render();
    assert_eq!(words(&model), vec!["Look", "here:"]);
    assert!(model.body.contains(&ViewNode::Image {
        src: "x.png".into(),
        height: 200,
    }));
}

#[test]
fn heading_markup_is_part_of_the_label() {
    let mut nav = navigator("# The beginning\n[Intro](link \"*Intro*\")\n\n# *Intro*\nhello\n");
    let model = nav.render();
    nav.dispatch(model.links()[0].activate());
    let model = nav.render();
    assert_eq!(heading(&model), Some("*Intro*"));
    assert_eq!(words(&model), vec!["hello"]);
}

#[test]
fn setext_underline_stays_on_the_card() {
    let nav = navigator("# The beginning\nSome words\n---\nmore\n");
    assert_eq!(nav.document().sections.len(), 1);
    assert_eq!(words(&nav.render()), vec!["Some", "words", "more"]);
}

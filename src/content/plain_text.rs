use markdown::mdast::Node;

/// Output buffer that can be rolled back to an earlier length.
#[derive(Debug, Default)]
pub struct SnippetBuffer {
    buf: String,
}

/// Position in a [`SnippetBuffer`] returned by [`SnippetBuffer::mark`].
#[must_use]
#[derive(Debug)]
pub struct Checkpoint(usize);

impl SnippetBuffer {
    pub fn new() -> Self {
        SnippetBuffer::default()
    }

    pub fn mark(&self) -> Checkpoint {
        Checkpoint(self.buf.len())
    }

    /// Drops everything written after the checkpoint.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.buf.truncate(checkpoint.0);
    }

    /// Text written since the checkpoint was taken.
    pub fn since(&self, checkpoint: &Checkpoint) -> &str {
        &self.buf[checkpoint.0..]
    }

    pub fn push_str(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// How a syntax node contributes to the prose-only text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Top level container, children are visited.
    Document,
    /// The only construct that commits prose.
    Paragraph,
    /// Content is visited and then thrown away.
    Excluded,
    /// Markup is dropped, children are kept.
    Passthrough,
    /// Literal text.
    Prose,
    /// Contributes nothing, children are not visited.
    Silent,
}

impl NodeRole {
    pub fn of(node: &Node) -> NodeRole {
        match node {
            Node::Root(_) => NodeRole::Document,
            Node::Paragraph(_) => NodeRole::Paragraph,

            Node::Heading(_)
            | Node::List(_)
            | Node::ListItem(_)
            | Node::FootnoteDefinition(_)
            | Node::Table(_)
            | Node::TableRow(_)
            | Node::TableCell(_)
            | Node::Image(_)
            | Node::ImageReference(_)
            | Node::Code(_)
            | Node::Math(_)
            | Node::Blockquote(_)
            | Node::Definition(_)
            | Node::Yaml(_)
            | Node::Toml(_) => NodeRole::Excluded,

            Node::Emphasis(_)
            | Node::Strong(_)
            | Node::Link(_)
            | Node::LinkReference(_) => NodeRole::Passthrough,

            Node::Text(_) | Node::InlineCode(_) => NodeRole::Prose,

            // Breaks, rules, strikethrough, raw html, footnote refs and mdx
            _ => NodeRole::Silent,
        }
    }
}

/// Visitor over the markdown syntax tree. Only the constructs that matter
/// for text extraction have their own method; everything else is skipped.
pub trait NodeVisitor {
    fn visit_paragraph(&mut self, node: &Node) {
        self.visit_children(node);
    }

    fn visit_excluded(&mut self, _node: &Node) {}

    fn visit_prose(&mut self, _text: &str) {}

    fn visit(&mut self, node: &Node) {
        match NodeRole::of(node) {
            NodeRole::Document | NodeRole::Passthrough => self.visit_children(node),
            NodeRole::Paragraph => self.visit_paragraph(node),
            NodeRole::Excluded => self.visit_excluded(node),
            NodeRole::Prose => match node {
                Node::Text(text) => self.visit_prose(&text.value),
                Node::InlineCode(code) => self.visit_prose(&code.value),
                _ => {}
            },
            NodeRole::Silent => {}
        }
    }

    fn visit_children(&mut self, node: &Node) {
        if let Some(children) = node.children() {
            for child in children {
                self.visit(child);
            }
        }
    }
}

/// Collects paragraph prose in document order, each paragraph followed by a
/// blank line. Headers, lists, tables, code, images and footnotes are dropped.
#[derive(Debug, Default)]
pub struct PlainTextExtractor {
    buffer: SnippetBuffer,
}

impl PlainTextExtractor {
    pub fn new() -> Self {
        PlainTextExtractor::default()
    }

    pub fn extract(root: &Node) -> String {
        let mut extractor = PlainTextExtractor::new();
        extractor.visit(root);
        extractor.into_text()
    }

    pub fn into_text(self) -> String {
        self.buffer.into_string()
    }
}

impl NodeVisitor for PlainTextExtractor {
    fn visit_paragraph(&mut self, node: &Node) {
        let checkpoint = self.buffer.mark();
        self.visit_children(node);
        if self.buffer.since(&checkpoint).trim().is_empty() {
            self.buffer.rollback(checkpoint);
            return;
        }
        self.buffer.push_str("\n\n");
    }

    fn visit_excluded(&mut self, node: &Node) {
        let checkpoint = self.buffer.mark();
        self.visit_children(node);
        self.buffer.rollback(checkpoint);
    }

    fn visit_prose(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

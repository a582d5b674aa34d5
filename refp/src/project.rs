//! `MSBuild` project files model.
//!
//! [`MsbuildProject`] keeps the original text of a project file and only records byte
//! ranges of the elements it understands (imports, references with their metadata
//! and properties). Every change is a splice of the original text followed by
//! re-reading, so everything else (declaration, comments, whitespace, attributes order,
//! line endings, BOM) stays exactly as it was.

use std::borrow::Cow;
use std::fs;
use std::ops::Range;
use std::path::Path;

use miette::{Context, Diagnostic, IntoDiagnostic, SourceSpan};
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::msbuild;

const UTF8_BOM: &str = "\u{feff}";
const DEFAULT_INDENT: &str = "  ";

/// Loads and saves projects
pub trait ProjectStore {
    type Project: ProjectModel;

    /// Loads project from the path specified
    fn load(&self, path: &Path) -> miette::Result<Self::Project>;

    /// Saves project into the path specified
    fn save(&self, project: &Self::Project, path: &Path) -> miette::Result<()>;
}

/// Project content that can be inspected and changed
pub trait ProjectModel {
    /// All imports in document order
    fn imports(&self) -> &[Import];

    /// Appends import as the last child of the project
    fn add_import(&mut self, project: &str, condition: Option<&str>) -> Result<(), ProjectError>;

    /// All `Reference` items in document order
    fn references(&self) -> &[Reference];

    /// Sets metadata `key` of the reference at `index` (see [`ProjectModel::references`]).
    /// Metadata created if missing
    fn set_metadata(&mut self, index: usize, key: &str, value: &str) -> Result<(), ProjectError>;

    /// All properties defined in property groups in document order
    fn properties(&self) -> &[Property];

    /// Whether project changed since load
    fn is_modified(&self) -> bool;
}

#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("Malformed project file: {message}")]
    #[diagnostic(
        code(refp::project::malformed),
        help("Project file must be well formed XML document")
    )]
    Malformed {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
    #[error("Project file root element must be <{}> but <{0}> found", msbuild::PROJECT)]
    #[diagnostic(code(refp::project::not_project))]
    NotProject(String),
    #[error("Reference with index {0} not found")]
    #[diagnostic(code(refp::project::missing_reference))]
    MissingReference(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub project: String,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// Reference item metadata
#[derive(Debug, Clone, PartialEq, Eq)]
struct Metadata {
    name: String,
    value: String,
    span: MetadataSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum MetadataSpan {
    /// Text between start and end tags
    Content(Range<usize>),
    /// Whole self-closing element
    Element(Range<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    include: String,
    metadata: Vec<Metadata>,
    open: Range<usize>,
    close: Option<Range<usize>>,
}

impl Reference {
    /// Value of `Include` attribute
    #[must_use]
    pub fn include(&self) -> &str {
        &self.include
    }

    /// Metadata value by name. Names compared case insensitively
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.find(key).map(|m| m.value.as_str())
    }

    fn find(&self, key: &str) -> Option<&Metadata> {
        self.metadata
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(key))
    }
}

/// Format preserving `MSBuild` project document
#[derive(Debug, Clone)]
pub struct MsbuildProject {
    bom: bool,
    body: String,
    layout: Layout,
    modified: bool,
}

#[derive(Debug, Clone, Default)]
struct Layout {
    imports: Vec<Import>,
    references: Vec<Reference>,
    properties: Vec<Property>,
    root_open: Range<usize>,
    root_close: Option<Range<usize>>,
    indent: Option<String>,
}

impl MsbuildProject {
    /// Parses project file content
    pub fn parse(text: &str) -> Result<Self, ProjectError> {
        let (bom, body) = match text.strip_prefix(UTF8_BOM) {
            Some(b) => (true, b),
            None => (false, text),
        };
        let layout = Layout::read(body)?;
        Ok(Self {
            bom,
            body: body.to_owned(),
            layout,
            modified: false,
        })
    }

    /// Full document text including BOM if it was there
    #[must_use]
    pub fn to_text(&self) -> String {
        if self.bom {
            format!("{UTF8_BOM}{}", self.body)
        } else {
            self.body.clone()
        }
    }

    fn splice(&mut self, range: Range<usize>, replacement: &str) -> Result<(), ProjectError> {
        let mut body = self.body.clone();
        body.replace_range(range, replacement);
        self.layout = Layout::read(&body)?;
        self.body = body;
        self.modified = true;
        Ok(())
    }

    fn line_ending(&self) -> &'static str {
        if self.body.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    fn indent_unit(&self) -> &str {
        self.layout.indent.as_deref().unwrap_or(DEFAULT_INDENT)
    }

    /// Converts `<Project ... />` into `<Project ...></Project>` pair
    fn ensure_root_closed(&mut self) -> Result<Range<usize>, ProjectError> {
        if let Some(close) = &self.layout.root_close {
            return Ok(close.clone());
        }
        let open = self.layout.root_open.clone();
        let eol = self.line_ending();
        let expanded = format!(
            "{}{eol}</{}>",
            open_tag_of(&self.body[open.clone()]),
            msbuild::PROJECT
        );
        self.splice(open, &expanded)?;
        self.layout.root_close.clone().ok_or_else(|| ProjectError::Malformed {
            message: format!("Cannot close <{}> element", msbuild::PROJECT),
            src: self.body.clone(),
            span: (0, 0).into(),
        })
    }
}

impl ProjectModel for MsbuildProject {
    fn imports(&self) -> &[Import] {
        &self.layout.imports
    }

    fn add_import(&mut self, project: &str, condition: Option<&str>) -> Result<(), ProjectError> {
        let close = self.ensure_root_closed()?;
        let eol = self.line_ending();
        let element = match condition {
            Some(c) => format!(
                r#"<{} Project="{}" Condition="{}" />"#,
                msbuild::IMPORT,
                escape(project),
                escape(c)
            ),
            None => format!(r#"<{} Project="{}" />"#, msbuild::IMPORT, escape(project)),
        };

        let indent = self.indent_unit().to_owned();
        match line_start(&self.body, close.start) {
            Some(at) => self.splice(at..at, &format!("{indent}{element}{eol}")),
            None => self.splice(
                close.start..close.start,
                &format!("{eol}{indent}{element}{eol}"),
            ),
        }
    }

    fn references(&self) -> &[Reference] {
        &self.layout.references
    }

    fn set_metadata(&mut self, index: usize, key: &str, value: &str) -> Result<(), ProjectError> {
        let reference = self
            .layout
            .references
            .get(index)
            .ok_or(ProjectError::MissingReference(index))?;

        if let Some(m) = reference.find(key) {
            if m.value == value {
                return Ok(());
            }
            let (range, replacement) = match &m.span {
                MetadataSpan::Content(r) => (r.clone(), partial_escape(value).into_owned()),
                MetadataSpan::Element(r) => (
                    r.clone(),
                    format!("<{0}>{1}</{0}>", m.name, partial_escape(value)),
                ),
            };
            return self.splice(range, &replacement);
        }

        let eol = self.line_ending();
        let element = format!("<{key}>{}</{key}>", partial_escape(value));
        let reference_indent = line_indent(&self.body, reference.open.start).unwrap_or_default();
        let metadata_indent = format!("{reference_indent}{}", self.indent_unit());

        match reference.close.clone() {
            Some(close) => match line_start(&self.body, close.start) {
                Some(at) => self.splice(at..at, &format!("{metadata_indent}{element}{eol}")),
                None => self.splice(close.start..close.start, &element),
            },
            None => {
                let open = reference.open.clone();
                let expanded = format!(
                    "{}{eol}{metadata_indent}{element}{eol}{reference_indent}</{}>",
                    open_tag_of(&self.body[open.clone()]),
                    msbuild::REFERENCE
                );
                self.splice(open, &expanded)
            }
        }
    }

    fn properties(&self) -> &[Property] {
        &self.layout.properties
    }

    fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Metadata or property which text is being collected
struct Pending {
    name: String,
    depth: usize,
    content_start: usize,
    text: String,
}

impl Layout {
    fn read(body: &str) -> Result<Self, ProjectError> {
        let mut reader = Reader::from_str(body);
        let mut stack: Vec<String> = Vec::new();
        let mut layout = Layout::default();
        let mut reference: Option<Reference> = None;
        let mut pending: Option<Pending> = None;
        let mut root_seen = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| malformed(body, reader.buffer_position(), e.to_string()))?;
            let end = reader.buffer_position();

            match event {
                Event::Start(e) | Event::Empty(e) if stack.is_empty() && root_seen => {
                    let name = local_name(&e);
                    return Err(malformed(
                        body,
                        tag_start(body, end),
                        format!("Unexpected element <{name}> after root element"),
                    ));
                }
                Event::Start(e) => {
                    let range = tag_start(body, end)..end;
                    let name = local_name(&e);
                    layout.open(&stack, &name, &e, range, &mut reference, body)?;
                    root_seen = true;
                    if is_collected(&stack, reference.is_some()) {
                        pending = Some(Pending {
                            name: name.clone(),
                            depth: stack.len() + 1,
                            content_start: end,
                            text: String::new(),
                        });
                    }
                    stack.push(name);
                }
                Event::Empty(e) => {
                    let range = tag_start(body, end)..end;
                    let name = local_name(&e);
                    layout.open(&stack, &name, &e, range.clone(), &mut reference, body)?;
                    root_seen = true;
                    if is_collected(&stack, reference.is_some()) {
                        layout.collect(&stack, name, String::new(), MetadataSpan::Element(range), &mut reference);
                    } else if stack.len() == 2 && name == msbuild::REFERENCE {
                        // self-closing reference
                        layout.references.extend(reference.take());
                    }
                }
                Event::End(_) => {
                    let range = tag_start(body, end)..end;
                    let Some(name) = stack.pop() else {
                        return Err(malformed(body, range.start, "Unexpected end tag".to_owned()));
                    };
                    if let Some(p) = pending.take() {
                        if p.depth == stack.len() + 1 {
                            let span = MetadataSpan::Content(p.content_start..range.start);
                            layout.collect(&stack, p.name, p.text, span, &mut reference);
                        } else {
                            pending = Some(p);
                        }
                    }
                    if stack.len() == 2 && name == msbuild::REFERENCE {
                        if let Some(mut r) = reference.take() {
                            r.close = Some(range);
                            layout.references.push(r);
                        }
                    } else if stack.is_empty() {
                        layout.root_close = Some(range);
                    }
                }
                Event::Text(e) => {
                    if let Some(p) = pending.as_mut().filter(|p| p.depth == stack.len()) {
                        let text = e
                            .unescape()
                            .map_err(|err| malformed(body, end, err.to_string()))?;
                        p.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    if let Some(p) = pending.as_mut().filter(|p| p.depth == stack.len()) {
                        p.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(name) = stack.last() {
            return Err(malformed(
                body,
                body.len(),
                format!("Unclosed element <{name}>"),
            ));
        }
        if !root_seen {
            return Err(malformed(body, 0, "No root element".to_owned()));
        }
        Ok(layout)
    }

    /// Handles element start. `stack` contains names of all ancestors
    fn open(
        &mut self,
        stack: &[String],
        name: &str,
        e: &BytesStart,
        range: Range<usize>,
        reference: &mut Option<Reference>,
        body: &str,
    ) -> Result<(), ProjectError> {
        let at = range.start;
        let attr_error = move |err: quick_xml::Error| malformed(body, at, err.to_string());
        match stack {
            [] => {
                if name != msbuild::PROJECT {
                    return Err(ProjectError::NotProject(name.to_owned()));
                }
                self.root_open = range;
            }
            [_] => {
                if self.indent.is_none() {
                    self.indent = line_indent(body, range.start)
                        .filter(|s| !s.is_empty())
                        .map(ToOwned::to_owned);
                }
                if name == msbuild::IMPORT {
                    self.imports.push(read_import(e).map_err(attr_error)?);
                }
            }
            [_, parent] if parent == msbuild::IMPORT_GROUP && name == msbuild::IMPORT => {
                self.imports.push(read_import(e).map_err(attr_error)?);
            }
            [_, parent] if parent == msbuild::ITEM_GROUP && name == msbuild::REFERENCE => {
                let include = attribute(e, "Include")
                    .map_err(attr_error)?
                    .unwrap_or_default();
                *reference = Some(Reference {
                    include,
                    metadata: vec![],
                    open: range,
                    close: None,
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Stores collected metadata or property value
    fn collect(
        &mut self,
        stack: &[String],
        name: String,
        value: String,
        span: MetadataSpan,
        reference: &mut Option<Reference>,
    ) {
        match stack {
            [_, parent] if parent == msbuild::PROPERTY_GROUP => {
                self.properties.push(Property { name, value });
            }
            [_, _, _] => {
                if let Some(r) = reference.as_mut() {
                    r.metadata.push(Metadata { name, value, span });
                }
            }
            _ => {}
        }
    }
}

/// Whether element text is to be collected: reference metadata or property
fn is_collected(stack: &[String], inside_reference: bool) -> bool {
    match stack {
        [_, parent] => parent == msbuild::PROPERTY_GROUP,
        [_, _, parent] => inside_reference && parent == msbuild::REFERENCE,
        _ => false,
    }
}

fn read_import(e: &BytesStart) -> Result<Import, quick_xml::Error> {
    Ok(Import {
        project: attribute(e, "Project")?.unwrap_or_default(),
        condition: attribute(e, "Condition")?,
    })
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn malformed(body: &str, offset: usize, message: String) -> ProjectError {
    ProjectError::Malformed {
        message,
        src: body.to_owned(),
        span: (offset.min(body.len()), 0).into(),
    }
}

/// Start of the tag that ends right before `end`
fn tag_start(body: &str, end: usize) -> usize {
    body[..end].rfind('<').unwrap_or(0)
}

/// Whitespace before `pos` on its line. None if there is anything else
fn line_indent(body: &str, pos: usize) -> Option<&str> {
    let start = body[..pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &body[start..pos];
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(prefix)
}

/// Position of the line start if `pos` preceded only by whitespace on its line
fn line_start(body: &str, pos: usize) -> Option<usize> {
    line_indent(body, pos).map(|indent| pos - indent.len())
}

/// `<X a="b" />` becomes `<X a="b">`
fn open_tag_of(empty: &str) -> Cow<'_, str> {
    match empty.strip_suffix("/>") {
        Some(s) => Cow::Owned(format!("{}>", s.trim_end())),
        None => Cow::Borrowed(empty),
    }
}

/// File system backed [`ProjectStore`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MsbuildStore;

impl ProjectStore for MsbuildStore {
    type Project = MsbuildProject;

    fn load(&self, path: &Path) -> miette::Result<MsbuildProject> {
        let text = fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read project file: {}", path.display()))?;
        MsbuildProject::parse(&text)
            .wrap_err_with(|| format!("Failed to parse project file: {}", path.display()))
    }

    fn save(&self, project: &MsbuildProject, path: &Path) -> miette::Result<()> {
        if !project.is_modified() {
            tracing::debug!("Project {} not changed. Skip saving", path.display());
            return Ok(());
        }
        fs::write(path, project.to_text())
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to save project file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parse_csharp_project() {
        // Act
        let project = MsbuildProject::parse(CSHARP).unwrap();

        // Assert
        assert_eq!(
            project.imports(),
            &[
                Import {
                    project: r"$(MSBuildExtensionsPath)\$(MSBuildToolsVersion)\Microsoft.Common.props".to_owned(),
                    condition: Some(r"Exists('$(MSBuildExtensionsPath)\$(MSBuildToolsVersion)\Microsoft.Common.props')".to_owned()),
                },
                Import {
                    project: r"$(MSBuildToolsPath)\Microsoft.CSharp.targets".to_owned(),
                    condition: None,
                },
            ]
        );
        let refs = project.references();
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[0].include(), "System");
        assert_eq!(refs[0].get_metadata("HintPath"), None);
        assert_eq!(refs[1].include(), "Vendor.Grid, Version=2.1.0.0");
        assert_eq!(refs[1].get_metadata("HintPath"), Some(r"..\..\ext\vendor\Grid.dll"));
        assert_eq!(refs[1].get_metadata("hintpath"), Some(r"..\..\ext\vendor\Grid.dll"));
        assert_eq!(refs[1].get_metadata("Private"), Some("True"));
        assert_eq!(refs[2].get_metadata("HintPath"), Some(r"C:\ext\Excel & Co.olb"));
        assert_eq!(refs[3].get_metadata("HintPath"), Some(""));
        assert_eq!(
            project.properties()[..3],
            [
                Property { name: "Configuration".to_owned(), value: "Debug".to_owned() },
                Property { name: "OutputType".to_owned(), value: "Library".to_owned() },
                Property { name: "THIRD_PARTY_REFPATH".to_owned(), value: r"C:\ext".to_owned() },
            ]
        );
        assert!(!project.is_modified());
    }

    #[test]
    fn parse_ignores_commented_elements() {
        // Arrange
        let text = "<Project>\n  <!-- <Import Project=\"a.props\" /> -->\n  <ItemGroup>\n    <!-- <Reference Include=\"x\" /> -->\n  </ItemGroup>\n</Project>\n";

        // Act
        let project = MsbuildProject::parse(text).unwrap();

        // Assert
        assert!(project.imports().is_empty());
        assert!(project.references().is_empty());
    }

    #[test]
    fn parse_import_group() {
        // Arrange
        let text = "<Project>\n  <ImportGroup Label=\"PropertySheets\">\n    <Import Project=\"$(UserRootDir)\\Microsoft.Cpp.$(Platform).user.props\" />\n  </ImportGroup>\n</Project>";

        // Act
        let project = MsbuildProject::parse(text).unwrap();

        // Assert
        assert_eq!(project.imports().len(), 1);
        assert_eq!(
            project.imports()[0].project,
            r"$(UserRootDir)\Microsoft.Cpp.$(Platform).user.props"
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("<Project>")]
    #[case("<Project><ItemGroup></Project>")]
    #[case("<Project></Project><Project></Project>")]
    #[case("<Project><Import Project=\"a /></Project>")]
    #[trace]
    fn parse_malformed(#[case] text: &str) {
        // Act
        let result = MsbuildProject::parse(text);

        // Assert
        assert!(matches!(result, Err(ProjectError::Malformed { .. })));
    }

    #[test]
    fn parse_not_project() {
        // Act
        let result = MsbuildProject::parse("<?xml version=\"1.0\"?>\n<Solution />");

        // Assert
        assert!(matches!(result, Err(ProjectError::NotProject(n)) if n == "Solution"));
    }

    #[test]
    fn add_import_keeps_everything_else() {
        // Arrange
        let mut project = MsbuildProject::parse(CSHARP).unwrap();

        // Act
        project
            .add_import(r"..\..\global.props", Some("true"))
            .unwrap();

        // Assert
        let expected = CSHARP.replace(
            "</Project>",
            "  <Import Project=\"..\\..\\global.props\" Condition=\"true\" />\n</Project>",
        );
        assert_eq!(project.to_text(), expected);
        assert_eq!(project.imports().len(), 3);
        assert_eq!(project.imports()[2].condition.as_deref(), Some("true"));
        assert!(project.is_modified());
    }

    #[rstest]
    #[case("<Project />", "<Project>\n  <Import Project=\"g.props\" />\n</Project>")]
    #[case("<Project></Project>", "<Project>\n  <Import Project=\"g.props\" />\n</Project>")]
    #[case(
        "<Project>\r\n\t<PropertyGroup />\r\n</Project>\r\n",
        "<Project>\r\n\t<PropertyGroup />\r\n\t<Import Project=\"g.props\" />\r\n</Project>\r\n"
    )]
    #[case(
        "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Project>\n    <ItemGroup />\n</Project>",
        "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Project>\n    <ItemGroup />\n    <Import Project=\"g.props\" />\n</Project>"
    )]
    #[trace]
    fn add_import_layout(#[case] text: &str, #[case] expected: &str) {
        // Arrange
        let mut project = MsbuildProject::parse(text).unwrap();

        // Act
        project.add_import("g.props", None).unwrap();

        // Assert
        assert_eq!(project.to_text(), expected);
    }

    #[test]
    fn add_import_escapes_attributes() {
        // Arrange
        let mut project = MsbuildProject::parse("<Project>\n</Project>").unwrap();

        // Act
        project
            .add_import("a&b.props", Some("'$(X)' == 'y'"))
            .unwrap();

        // Assert
        assert_eq!(project.imports()[0].project, "a&b.props");
        assert_eq!(project.imports()[0].condition.as_deref(), Some("'$(X)' == 'y'"));
        assert!(project.to_text().contains("Project=\"a&amp;b.props\""));
    }

    #[test]
    fn set_metadata_replaces_existing_value() {
        // Arrange
        let mut project = MsbuildProject::parse(CSHARP).unwrap();

        // Act
        project
            .set_metadata(1, "HintPath", r"$(THIRD_PARTY_REFPATH)\vendor\Grid.dll")
            .unwrap();

        // Assert
        let expected = CSHARP.replace(
            r"<HintPath>..\..\ext\vendor\Grid.dll</HintPath>",
            r"<HintPath>$(THIRD_PARTY_REFPATH)\vendor\Grid.dll</HintPath>",
        );
        assert_eq!(project.to_text(), expected);
        assert_eq!(
            project.references()[1].get_metadata("HintPath"),
            Some(r"$(THIRD_PARTY_REFPATH)\vendor\Grid.dll")
        );
    }

    #[test]
    fn set_metadata_same_value_does_not_modify() {
        // Arrange
        let mut project = MsbuildProject::parse(CSHARP).unwrap();

        // Act
        project
            .set_metadata(1, "hintpath", r"..\..\ext\vendor\Grid.dll")
            .unwrap();

        // Assert
        assert!(!project.is_modified());
        assert_eq!(project.to_text(), CSHARP);
    }

    #[test]
    fn set_metadata_escapes_value() {
        // Arrange
        let mut project = MsbuildProject::parse(CSHARP).unwrap();

        // Act
        project.set_metadata(2, "HintPath", r"$(X)\Excel & Co.olb").unwrap();

        // Assert
        assert!(project
            .to_text()
            .contains(r"<HintPath>$(X)\Excel &amp; Co.olb</HintPath>"));
        assert_eq!(
            project.references()[2].get_metadata("HintPath"),
            Some(r"$(X)\Excel & Co.olb")
        );
    }

    #[test]
    fn set_metadata_expands_empty_metadata() {
        // Arrange
        let mut project = MsbuildProject::parse(CSHARP).unwrap();

        // Act
        project.set_metadata(3, "HintPath", "a.dll").unwrap();

        // Assert
        let expected = CSHARP.replace("<HintPath />", "<HintPath>a.dll</HintPath>");
        assert_eq!(project.to_text(), expected);
    }

    #[rstest]
    #[case(
        "<Project>\n  <ItemGroup>\n    <Reference Include=\"a\">\n      <Private>False</Private>\n    </Reference>\n  </ItemGroup>\n</Project>",
        "<Project>\n  <ItemGroup>\n    <Reference Include=\"a\">\n      <Private>False</Private>\n      <HintPath>a.dll</HintPath>\n    </Reference>\n  </ItemGroup>\n</Project>"
    )]
    #[case(
        "<Project>\n  <ItemGroup>\n    <Reference Include=\"a\" />\n  </ItemGroup>\n</Project>",
        "<Project>\n  <ItemGroup>\n    <Reference Include=\"a\">\n      <HintPath>a.dll</HintPath>\n    </Reference>\n  </ItemGroup>\n</Project>"
    )]
    #[case(
        "<Project><ItemGroup><Reference Include=\"a\"></Reference></ItemGroup></Project>",
        "<Project><ItemGroup><Reference Include=\"a\"><HintPath>a.dll</HintPath></Reference></ItemGroup></Project>"
    )]
    #[trace]
    fn set_metadata_inserts_missing(#[case] text: &str, #[case] expected: &str) {
        // Arrange
        let mut project = MsbuildProject::parse(text).unwrap();

        // Act
        project.set_metadata(0, "HintPath", "a.dll").unwrap();

        // Assert
        assert_eq!(project.to_text(), expected);
        assert_eq!(project.references()[0].get_metadata("HintPath"), Some("a.dll"));
    }

    #[test]
    fn set_metadata_missing_reference() {
        // Arrange
        let mut project = MsbuildProject::parse("<Project />").unwrap();

        // Act
        let result = project.set_metadata(0, "HintPath", "a.dll");

        // Assert
        assert!(matches!(result, Err(ProjectError::MissingReference(0))));
    }

    #[test]
    fn store_saves_only_modified() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csproj");
        fs::write(&path, CSHARP).unwrap();
        let store = MsbuildStore;
        let project = store.load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        // Act
        store.save(&project, &path).unwrap();

        // Assert
        assert!(!path.exists());
    }

    #[test]
    fn store_roundtrip() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csproj");
        fs::write(&path, CSHARP).unwrap();
        let store = MsbuildStore;
        let mut project = store.load(&path).unwrap();
        project.add_import("g.props", Some("true")).unwrap();

        // Act
        store.save(&project, &path).unwrap();

        // Assert
        let saved = store.load(&path).unwrap();
        assert_eq!(saved.imports().len(), 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), project.to_text());
    }

    #[test]
    fn store_load_missing_file() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();

        // Act
        let result = MsbuildStore.load(&dir.path().join("missing.csproj"));

        // Assert
        assert!(result.is_err());
    }

    const CSHARP: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <Import Project="$(MSBuildExtensionsPath)\$(MSBuildToolsVersion)\Microsoft.Common.props" Condition="Exists('$(MSBuildExtensionsPath)\$(MSBuildToolsVersion)\Microsoft.Common.props')" />
  <PropertyGroup>
    <Configuration Condition=" '$(Configuration)' == '' ">Debug</Configuration>
    <OutputType>Library</OutputType>
    <THIRD_PARTY_REFPATH>C:\ext</THIRD_PARTY_REFPATH>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="System" />
    <Reference Include="Vendor.Grid, Version=2.1.0.0">
      <HintPath>..\..\ext\vendor\Grid.dll</HintPath>
      <Private>True</Private>
    </Reference>
    <Reference Include="Excel">
      <!-- COM -->
      <HintPath>C:\ext\Excel &amp; Co.olb</HintPath>
    </Reference>
    <Reference Include="Empty">
      <HintPath />
    </Reference>
  </ItemGroup>
  <ItemGroup>
    <Compile Include="Class1.cs" />
  </ItemGroup>
  <Import Project="$(MSBuildToolsPath)\Microsoft.CSharp.targets" />
</Project>
"#;
}

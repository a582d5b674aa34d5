use miette::{miette, LabeledSpan, Report, SourceSpan};
use nom::bytes::complete::{is_not, tag, take_till, take_while1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, map, recognize};
use nom::error::{ParseError, VerboseError};
use nom::sequence::{delimited, preceded, separated_pair, tuple};
use nom::IResult;

use crate::api::{Project, Solution, Version};

const UTF8_BOM: &str = "\u{feff}";
const ERROR_HELP: &str = "Incorrect Visual Studio solution file syntax";
const HEADER: &str = "Microsoft Visual Studio Solution File, Format Version";
const END_PROJECT: &str = "EndProject";
const GLOBAL: &str = "Global";
const END_GLOBAL: &str = "EndGlobal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Header,
    Solution,
    Project,
    Global,
}

/// Parses a given string as a solution file.
///
/// Only the parts needed to find projects are interpreted: header (format),
/// product comment, version lines and project definitions in their order.
/// Project sections and global sections are validated to be closed
/// but their content is skipped.
///
/// # Errors
///
/// Returns an error if the content is empty, has no solution header,
/// contains malformed project definition or unclosed project or global block.
pub fn parse_str(contents: &str) -> miette::Result<Solution<'_>> {
    // Skip UTF-8 signature if necessary
    let input = contents.strip_prefix(UTF8_BOM).unwrap_or(contents);
    let mut offset = contents.len() - input.len();

    let mut solution = Solution::default();
    let mut context = Context::Header;

    for line in input.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let start = line_start + (line.len() - line.trim_start().len());

        context = match context {
            Context::Header => {
                let (_, format) = header::<VerboseError<&str>>(text).map_err(|_| {
                    report(
                        contents,
                        SourceSpan::new(start.into(), text.len()),
                        format!("'{HEADER} <version>' expected"),
                        "Invalid solution header",
                    )
                })?;
                solution.format = format;
                Context::Solution
            }
            Context::Solution => {
                if text.starts_with("Project(") {
                    let (_, project) = project::<VerboseError<&str>>(text).map_err(|_| {
                        report(
                            contents,
                            SourceSpan::new(start.into(), text.len()),
                            "Expected Project(\"{type}\") = \"name\", \"path\", \"{id}\"".to_owned(),
                            "Invalid project definition",
                        )
                    })?;
                    solution.projects.push(project);
                    Context::Project
                } else if text == GLOBAL {
                    Context::Global
                } else if let Some(comment) = text.strip_prefix('#') {
                    // Only comment text without sharp sign and spaces
                    if solution.product.is_empty() {
                        solution.product = comment.trim_start();
                    }
                    Context::Solution
                } else {
                    if let Ok((_, v)) = version::<VerboseError<&str>>(text) {
                        solution.versions.push(v);
                    }
                    Context::Solution
                }
            }
            Context::Project if text == END_PROJECT => Context::Solution,
            Context::Global if text == END_GLOBAL => Context::Solution,
            c => c,
        };
    }

    let location = contents.len().saturating_sub(1);
    match context {
        Context::Solution => Ok(solution),
        Context::Header => Err(miette!("Content is too short or empty")),
        Context::Project => Err(report(
            contents,
            SourceSpan::new(location.into(), 0),
            format!("Unexpected file end. Expected {END_PROJECT}"),
            "Unexpected end of file",
        )),
        Context::Global => Err(report(
            contents,
            SourceSpan::new(location.into(), 0),
            format!("Unexpected file end. Expected {END_GLOBAL}"),
            "Unexpected end of file",
        )),
    }
}

fn report(contents: &str, span: SourceSpan, label: String, message: &str) -> Report {
    miette!(
        labels = vec![LabeledSpan::at(span, label)],
        help = ERROR_HELP,
        "{message}"
    )
    .with_source_code(contents.to_owned())
}

fn header<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
    E: ParseError<&'a str> + std::fmt::Debug,
{
    preceded(tuple((tag(HEADER), space1)), digits_and_dots)(input)
}

fn project<'a, E>(input: &'a str) -> IResult<&'a str, Project<'a>, E>
where
    E: ParseError<&'a str> + std::fmt::Debug,
{
    let type_id = delimited(tag("Project(\""), guid, tag("\")"));
    let name = preceded(tuple((space0, char('='), space0)), quoted);
    let path = preceded(tuple((space0, char(','), space0)), quoted);
    let id = preceded(
        tuple((space0, char(','), space0)),
        delimited(char('"'), guid, char('"')),
    );

    map(
        all_consuming(tuple((type_id, name, path, id))),
        |(type_id, name, path, id)| Project::new(type_id, name, path, id),
    )(input)
}

fn version<'a, E>(input: &'a str) -> IResult<&'a str, Version<'a>, E>
where
    E: ParseError<&'a str> + std::fmt::Debug,
{
    map(
        all_consuming(separated_pair(
            identifier,
            tuple((space0, char('='), space0)),
            digits_and_dots,
        )),
        |(name, version)| Version { name, version },
    )(input)
}

fn guid<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
    E: ParseError<&'a str> + std::fmt::Debug,
{
    recognize(delimited(char('{'), is_not("{}"), char('}')))(input)
}

fn quoted<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
    E: ParseError<&'a str> + std::fmt::Debug,
{
    delimited(char('"'), take_till(|c| c == '"'), char('"'))(input)
}

fn identifier<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
    E: ParseError<&'a str> + std::fmt::Debug,
{
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn digits_and_dots<'a, E>(input: &'a str) -> IResult<&'a str, &'a str, E>
where
    E: ParseError<&'a str> + std::fmt::Debug,
{
    take_while1(|c: char| c.is_ascii_digit() || c == '.')(input)
}

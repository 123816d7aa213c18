//! Slide-deck encoder: writes a minimal PresentationML package (one master,
//! one blank layout, one theme) with `zip`, escaping text with `quick-xml`.

use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::template::{BRAND_COLOR, CONSULTANT_NAME, OutlineItem, Slide, SlideBody, StyledLine};
use crate::error::ExportError;

const EMU_PER_INCH: f64 = 914_400.0;
const SLIDE_WIDTH: i64 = 9_144_000;
const SLIDE_HEIGHT: i64 = 6_858_000;
const BORDER_COLOR: &str = "CCCCCC";
const SHADE_COLOR: &str = "F8F9FA";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn encoding_error(e: impl std::fmt::Display) -> ExportError {
    ExportError::Encoding {
        format: "pptx",
        reason: e.to_string(),
    }
}

/// Encode slides into `.pptx` bytes.
pub fn encode(slides: &[Slide], title: &str) -> Result<Vec<u8>, ExportError> {
    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types(slides.len())),
        ("_rels/.rels".into(), root_rels()),
        ("docProps/core.xml".into(), core_props(title)),
        ("docProps/app.xml".into(), app_props(slides.len())),
        ("ppt/presentation.xml".into(), presentation(slides.len())),
        (
            "ppt/_rels/presentation.xml.rels".into(),
            presentation_rels(slides.len()),
        ),
        ("ppt/slideMasters/slideMaster1.xml".into(), slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            relationships(&[
                ("slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("theme", "../theme/theme1.xml"),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".into(), slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            relationships(&[("slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        ("ppt/theme/theme1.xml".into(), THEME.to_string()),
    ];
    for (i, slide) in slides.iter().enumerate() {
        let n = i + 1;
        parts.push((format!("ppt/slides/slide{n}.xml"), slide_xml(slide)));
        parts.push((
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[("slideLayout", "../slideLayouts/slideLayout1.xml")]),
        ));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in &parts {
        zip.start_file(name.as_str(), options)
            .map_err(encoding_error)?;
        zip.write_all(body.as_bytes()).map_err(encoding_error)?;
    }
    let cursor = zip.finish().map_err(encoding_error)?;
    Ok(cursor.into_inner())
}

// ── Package parts ───────────────────────────────────────────────────

fn content_types(slide_count: usize) -> String {
    let ct = "application/vnd.openxmlformats-officedocument";
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="{ct}.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{ct}.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{ct}.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="{ct}.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="{ct}.extended-properties+xml"/>"#
    );
    for n in 1..=slide_count {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{ct}.presentationml.slide+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_TYPE}/officeDocument" Target="ppt/presentation.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="{REL_TYPE}/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

/// Relationship part with ids `rId1..` in order.
fn relationships(targets: &[(&str, &str)]) -> String {
    let mut xml = format!(r#"{XML_DECL}<Relationships xmlns="{REL_NS}">"#);
    for (i, (kind, target)) in targets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{REL_TYPE}/{kind}" Target="{target}"/>"#,
            i + 1
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn core_props(title: &str) -> String {
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>{}</dc:creator></cp:coreProperties>"#,
        escape(title),
        escape(CONSULTANT_NAME)
    )
}

fn app_props(slide_count: usize) -> String {
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>ai-consult</Application><Company>Marketing Consulting Services</Company><Slides>{slide_count}</Slides></Properties>"#
    )
}

fn presentation(slide_count: usize) -> String {
    // rId1 is the master, rId2 the theme, slides follow.
    let slide_ids: String = (0..slide_count)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 3))
        .collect();
    format!(
        r#"{XML_DECL}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}" type="screen4x3"/><p:notesSz cx="{SLIDE_HEIGHT}" cy="{SLIDE_WIDTH}"/></p:presentation>"#
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let slides: Vec<String> = (1..=slide_count)
        .map(|n| format!("slides/slide{n}.xml"))
        .collect();
    let mut targets = vec![
        ("slideMaster", "slideMasters/slideMaster1.xml"),
        ("theme", "theme/theme1.xml"),
    ];
    targets.extend(slides.iter().map(|s| ("slide", s.as_str())));
    relationships(&targets)
}

const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Consult"><a:themeElements><a:clrScheme name="Consult"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F2937"/></a:dk2><a:lt2><a:srgbClr val="F8F9FA"/></a:lt2><a:accent1><a:srgbClr val="2563EB"/></a:accent1><a:accent2><a:srgbClr val="22C55E"/></a:accent2><a:accent3><a:srgbClr val="F59E0B"/></a:accent3><a:accent4><a:srgbClr val="EF4444"/></a:accent4><a:accent5><a:srgbClr val="6366F1"/></a:accent5><a:accent6><a:srgbClr val="0EA5E9"/></a:accent6><a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="7C3AED"/></a:folHlink></a:clrScheme><a:fontScheme name="Consult"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Consult"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

// ── Slide content ───────────────────────────────────────────────────

/// Position and size in inches.
#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl Rect {
    const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    fn xfrm(&self, tag: &str) -> String {
        format!(
            r#"<{tag}><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></{tag}>"#,
            emu(self.x),
            emu(self.y),
            emu(self.w),
            emu(self.h)
        )
    }
}

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

const TITLE_RECT: Rect = Rect::new(0.5, 0.5, 9.0, 1.0);
const BODY_RECT: Rect = Rect::new(0.5, 1.5, 9.0, 5.0);
const TABLE_RECT: Rect = Rect::new(0.5, 1.8, 9.0, 4.0);
const CARD_RECT: Rect = Rect::new(1.0, 2.0, 8.0, 4.0);

#[derive(Debug, Clone, Copy, Default)]
struct RunStyle<'a> {
    size_pt: u32,
    bold: bool,
    italic: bool,
    color: Option<&'a str>,
}

fn run(text: &str, style: RunStyle<'_>) -> String {
    let mut attrs = format!(r#"lang="en-US" sz="{}""#, style.size_pt * 100);
    if style.bold {
        attrs.push_str(r#" b="1""#);
    }
    if style.italic {
        attrs.push_str(r#" i="1""#);
    }
    let fill = style
        .color
        .map(|c| format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, c.to_uppercase()))
        .unwrap_or_default();
    format!(
        r#"<a:r><a:rPr {attrs} dirty="0">{fill}</a:rPr><a:t>{}</a:t></a:r>"#,
        escape(text)
    )
}

#[derive(Debug, Clone, Copy)]
enum Bullet {
    Level0,
    Level1,
}

fn paragraph(text: &str, style: RunStyle<'_>, centered: bool, bullet: Option<Bullet>) -> String {
    let mut ppr = String::new();
    match bullet {
        Some(Bullet::Level0) => ppr.push_str(
            r#"<a:pPr marL="342900" indent="-342900"><a:buFont typeface="Arial"/><a:buChar char="•"/></a:pPr>"#,
        ),
        Some(Bullet::Level1) => ppr.push_str(
            r#"<a:pPr marL="742950" lvl="1" indent="-285750"><a:buFont typeface="Arial"/><a:buChar char="•"/></a:pPr>"#,
        ),
        None if centered => ppr.push_str(r#"<a:pPr algn="ctr"/>"#),
        None => {}
    }
    if text.is_empty() {
        return format!(
            r#"<a:p>{ppr}<a:endParaRPr lang="en-US" sz="{}" dirty="0"/></a:p>"#,
            style.size_pt * 100
        );
    }
    format!("<a:p>{ppr}{}</a:p>", run(text, style))
}

fn text_box(id: u32, rect: Rect, paragraphs: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        rect.xfrm("a:xfrm")
    )
}

fn solid_line(tag: &str) -> String {
    format!(
        r#"<{tag} w="12700"><a:solidFill><a:srgbClr val="{BORDER_COLOR}"/></a:solidFill></{tag}>"#
    )
}

fn table_frame(id: u32, rect: Rect, rows: &[Vec<String>], shaded: bool) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let col_width = emu(rect.w) / columns as i64;
    let row_height = emu(rect.h) / rows.len().max(1) as i64;
    let grid: String = (0..columns)
        .map(|_| format!(r#"<a:gridCol w="{col_width}"/>"#))
        .collect();
    let borders: String = ["a:lnL", "a:lnR", "a:lnT", "a:lnB"]
        .iter()
        .map(|tag| solid_line(tag))
        .collect();
    let fill = if shaded {
        format!(r#"<a:solidFill><a:srgbClr val="{SHADE_COLOR}"/></a:solidFill>"#)
    } else {
        String::new()
    };

    let body: String = rows
        .iter()
        .enumerate()
        .map(|(r, cells)| {
            let cells_xml: String = (0..columns)
                .map(|c| {
                    let text = cells.get(c).map(String::as_str).unwrap_or("");
                    let style = RunStyle {
                        size_pt: 16,
                        bold: r == 0,
                        ..Default::default()
                    };
                    format!(
                        "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr>{borders}{fill}</a:tcPr></a:tc>",
                        paragraph(text, style, false, None)
                    )
                })
                .collect();
            format!(r#"<a:tr h="{row_height}">{cells_xml}</a:tr>"#)
        })
        .collect();

    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>{}<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1"/><a:tblGrid>{grid}</a:tblGrid>{body}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        rect.xfrm("p:xfrm")
    )
}

fn styled(line: &StyledLine) -> RunStyle<'static> {
    RunStyle {
        size_pt: line.size_pt,
        bold: line.bold,
        italic: line.italic,
        color: None,
    }
}

fn slide_xml(slide: &Slide) -> String {
    let title_style = RunStyle {
        size_pt: 32,
        bold: true,
        italic: false,
        color: Some(BRAND_COLOR),
    };

    let shapes = match &slide.body {
        SlideBody::Cover(lines) => {
            let cover_style = RunStyle {
                size_pt: 36,
                ..title_style
            };
            let mut shapes = vec![text_box(
                2,
                Rect::new(1.0, 2.0, 8.0, 1.5),
                &paragraph(&slide.title, cover_style, true, None),
            )];
            let positions = [(4.0, 0.8), (5.0, 0.6), (6.5, 0.6)];
            for (i, (line, (y, h))) in lines.iter().zip(positions).enumerate() {
                shapes.push(text_box(
                    3 + i as u32,
                    Rect::new(1.0, y, 8.0, h),
                    &paragraph(&line.text, styled(line), true, None),
                ));
            }
            shapes
        }
        SlideBody::Outline(items) => {
            let paragraphs: String = items
                .iter()
                .map(|item| match item {
                    OutlineItem::Header(text) => paragraph(
                        text,
                        RunStyle {
                            size_pt: 20,
                            bold: true,
                            ..Default::default()
                        },
                        false,
                        Some(Bullet::Level0),
                    ),
                    OutlineItem::Point(text) => paragraph(
                        text,
                        RunStyle {
                            size_pt: 16,
                            ..Default::default()
                        },
                        false,
                        Some(Bullet::Level1),
                    ),
                    OutlineItem::Spacer => paragraph(
                        "",
                        RunStyle {
                            size_pt: 12,
                            ..Default::default()
                        },
                        false,
                        None,
                    ),
                })
                .collect();
            vec![
                text_box(2, TITLE_RECT, &paragraph(&slide.title, title_style, false, None)),
                text_box(3, BODY_RECT, &paragraphs),
            ]
        }
        SlideBody::Table { rows, shaded } => vec![
            text_box(2, TITLE_RECT, &paragraph(&slide.title, title_style, false, None)),
            table_frame(3, TABLE_RECT, rows, *shaded),
        ],
        SlideBody::Card(lines) => {
            let paragraphs: String = lines
                .iter()
                .map(|line| paragraph(&line.text, styled(line), true, None))
                .collect();
            vec![
                text_box(2, TITLE_RECT, &paragraph(&slide.title, title_style, false, None)),
                text_box(3, CARD_RECT, &paragraphs),
            ]
        }
    };

    format!(
        r#"{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{EMPTY_TREE}{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        shapes.concat()
    )
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::export::template::proposal_deck;
    use crate::export::template::tests::{date, sample_assessments, sample_data};

    fn read_part(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> String {
        let mut xml = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn package_has_every_part() {
        let slides = proposal_deck(&sample_data(sample_assessments()), date());
        let bytes = encode(&slides, "Proposal - Acme").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();

        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "ppt/presentation.xml",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide8.xml",
            "ppt/slides/_rels/slide8.xml.rels",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {name}");
        }

        let presentation = read_part(&mut archive, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 8);
        let types = read_part(&mut archive, "[Content_Types].xml");
        assert!(types.contains("/ppt/slides/slide8.xml"));
    }

    #[test]
    fn text_is_escaped() {
        let slides = proposal_deck(&sample_data(vec![]), date());
        let bytes = encode(&slides, "A & B").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();

        let cover = read_part(&mut archive, "ppt/slides/slide1.xml");
        assert!(cover.contains("MARKETING &amp; PR STRATEGY PROPOSAL"));
        assert!(!cover.contains("MARKETING & PR"));
        let core = read_part(&mut archive, "docProps/core.xml");
        assert!(core.contains("<dc:title>A &amp; B</dc:title>"));
    }

    #[test]
    fn assessment_slide_only_with_assessments() {
        let without = encode(&proposal_deck(&sample_data(vec![]), date()), "t").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(without.as_slice())).unwrap();
        assert!(archive.by_name("ppt/slides/slide7.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide8.xml").is_err());

        let with = encode(&proposal_deck(&sample_data(sample_assessments()), date()), "t").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(with.as_slice())).unwrap();
        let slide = read_part(&mut archive, "ppt/slides/slide4.xml");
        assert!(slide.contains("Strategic Assessment Results"));
        assert!(slide.contains("Needs Attention"));
        assert!(slide.contains("<a:tbl>"));
    }

    #[test]
    fn emu_conversion() {
        assert_eq!(emu(1.0), 914_400);
        assert_eq!(emu(0.5), 457_200);
    }
}

// In-memory PDF builder shared by the integration tests
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// One line of a page: font size and text. An empty text leaves a
/// paragraph gap instead.
pub type Line = (i64, &'static str);

pub const GAP: Line = (0, "");

const TOP: i64 = 780;
const GAP_POINTS: i64 = 20;

#[derive(Default)]
pub struct BookSpec {
    pub title: Option<&'static str>,
    pub author: Option<&'static str>,
    pub pages: Vec<Vec<Line>>,
    /// Top-level bookmarks: title and 1-based page
    pub bookmarks: Vec<(&'static str, usize)>,
}

fn page_operations(lines: &[Line]) -> Vec<Operation> {
    let mut operations = Vec::new();
    let mut y = TOP;
    for &(size, text) in lines {
        if text.is_empty() {
            y -= GAP_POINTS;
            continue;
        }
        y -= size * 13 / 10;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), size.into()]),
            Operation::new("Td", vec![72.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);
    }
    operations
}

pub fn build_pdf(book: &BookSpec) -> Vec<u8> {
    let mut doc = build_document(book);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn build_document(book: &BookSpec) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for lines in &book.pages {
        let content = Content { operations: page_operations(lines) };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => page_ids.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if !book.bookmarks.is_empty() {
        let outlines_id = add_outline(&mut doc, &book.bookmarks, &page_ids);
        catalog.set("Outlines", outlines_id);
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! {};
    if let Some(title) = book.title {
        info.set("Title", Object::string_literal(title));
    }
    if let Some(author) = book.author {
        info.set("Author", Object::string_literal(author));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);
    doc
}

/// Object ids of the top-level bookmarks, in order
pub fn bookmark_ids(doc: &Document) -> Vec<ObjectId> {
    let root = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
    let catalog = doc.get_object(root).and_then(Object::as_dict).unwrap();
    let outlines = catalog.get(b"Outlines").and_then(Object::as_reference).unwrap();
    let mut current = doc
        .get_object(outlines)
        .and_then(Object::as_dict)
        .and_then(|o| o.get(b"First"))
        .and_then(Object::as_reference)
        .ok();

    let mut ids = Vec::new();
    while let Some(id) = current {
        if ids.contains(&id) {
            break;
        }
        ids.push(id);
        current = doc
            .get_object(id)
            .and_then(Object::as_dict)
            .and_then(|item| item.get(b"Next"))
            .and_then(Object::as_reference)
            .ok();
    }
    ids
}

pub fn bookmark_mut(doc: &mut Document, id: ObjectId) -> &mut lopdf::Dictionary {
    doc.get_object_mut(id).and_then(Object::as_dict_mut).unwrap()
}

fn add_outline(doc: &mut Document, bookmarks: &[(&str, usize)], page_ids: &[ObjectId]) -> ObjectId {
    let outlines_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = bookmarks.iter().map(|_| doc.new_object_id()).collect();

    for (i, (title, page)) in bookmarks.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(*title),
            "Parent" => outlines_id,
            "Dest" => vec![
                Object::Reference(page_ids[page - 1]),
                "XYZ".into(),
                Object::Null,
                Object::Null,
                Object::Null,
            ],
        };
        if i > 0 {
            item.set("Prev", item_ids[i - 1]);
        }
        if let Some(next) = item_ids.get(i + 1) {
            item.set("Next", *next);
        }
        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }

    doc.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => item_ids[0],
            "Last" => item_ids[item_ids.len() - 1],
            "Count" => item_ids.len() as i64,
        }),
    );
    outlines_id
}

/// Two chapters set in larger type, topics one size down, no chapter words
pub fn font_size_book() -> BookSpec {
    BookSpec {
        title: Some("Physics Basics"),
        author: Some("J. Doe"),
        pages: vec![
            vec![
                (20, "Motion"),
                (14, "Velocity"),
                (11, "Velocity is the rate of change of position. It always has a direction."),
                GAP,
                (11, "For example: a car heading north at ten meters per second has a velocity."),
                GAP,
                (14, "Acceleration"),
                (11, "Acceleration is the rate of change of velocity. Falling objects speed up."),
            ],
            vec![
                (20, "Energy"),
                (14, "Kinetic Energy"),
                (11, "Kinetic energy belongs to moving objects. Faster objects carry more of it."),
                GAP,
                (14, "Potential Energy"),
                (11, "Potential energy is stored energy. A raised book holds it above the floor."),
            ],
        ],
        bookmarks: Vec::new(),
    }
}

/// "Chapter N: Title" markers with numbered sections
pub fn keyword_book() -> BookSpec {
    BookSpec {
        title: Some("Chemistry Notes"),
        pages: vec![
            vec![
                (16, "Chapter 1: Atoms"),
                GAP,
                (11, "1.1 Electrons"),
                GAP,
                (11, "Electrons orbit the nucleus. They carry a negative charge."),
                GAP,
                (11, "1.2 Protons"),
                GAP,
                (11, "Protons sit in the nucleus. They carry a positive charge."),
            ],
            vec![
                (16, "Chapter 2: Bonds"),
                GAP,
                (11, "Atoms share or trade electrons to form bonds. Water molecules hold two bonds."),
            ],
        ],
        ..Default::default()
    }
}

/// Plain pages whose chapters are only known from the bookmarks
pub fn outlined_book() -> BookSpec {
    BookSpec {
        title: Some("Outlined"),
        pages: vec![
            vec![(11, "Forces push and pull on objects. Friction slows sliding boxes.")],
            vec![(11, "Gravity pulls every mass toward every other mass. Planets orbit the sun.")],
            vec![(11, "Energy can change form but is conserved. Heat flows from hot to cold.")],
        ],
        bookmarks: vec![("Forces", 1), ("Energy", 3)],
        ..Default::default()
    }
}

/// No headings, chapter words, numbering or bookmarks
pub fn plain_book() -> BookSpec {
    BookSpec {
        pages: vec![vec![
            (11, "Plants turn light into sugar. Leaves hold the green pigment."),
            GAP,
            (11, "Roots draw water from the soil. Stems carry it upward."),
        ]],
        ..Default::default()
    }
}

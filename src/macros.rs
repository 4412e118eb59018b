#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`TagRule`](crate::TagRule).
///
/// ```ignore
/// tag! {
///     name: "link",
///     open: "[[",
///     close: "]]",
///     separators: ["|"],
///     render: |content: &TagContent, _doc: &mut DocumentState| -> String {
///         format!("<a href=\"{}\">{}</a>", content.raw(1), content.text(0))
///     }
/// }
/// ```
#[macro_export]
macro_rules! tag {
    (
        name: $name:expr,
        open: $open:expr,
        close: $close:expr
        $(, separators: [ $($sep:expr),* $(,)? ])?
        $(, nested: $nested:expr)?
        , render: |$content:ident : &$content_ty:ty, $doc:ident : &mut $doc_ty:ty| -> String $body:block
        $(,)?
    ) => {{
        $crate::TagRule {
            name: $name,
            open: $open,
            close: $close,
            separators: &[ $($($sep),*)? ],
            nested: { true $(&& $nested)? },
            render: Box::new(move |$content: &$content_ty, $doc: &mut $doc_ty| -> String { $body }),
        }
    }};
}

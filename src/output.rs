use pulldown_cmark::{Options, Parser, html};

/// Render model markdown as an HTML fragment safe to insert into the page.
///
/// Raw HTML in the markdown survives conversion, so the result always goes through
/// ammonia's allow-list before it leaves this function.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut unsafe_html = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut unsafe_html, parser);

    ammonia::clean(&unsafe_html)
}

pub fn system_search_agent() -> String {
    r#"You are a web research assistant. You are given the raw text of a search-engine
result page produced by a web scraper tool. Your job is to point at pages where a term
is actually used, so its spelling can be measured."#
        .to_string()
}

pub fn user_search_agent(query: &str, tool_output: &str, max_urls: usize) -> String {
    format!(r#"QUERY (exact match):
{query}

WEB SCRAPER OUTPUT:
<{tool_output}>

TASK:
List up to {max_urls} full URLs (starting with http:// or https://) of pages that
contain the query term. Prefer URLs that appear in the scraper output.

CONSTRAINTS:
- One URL per line.
- No commentary, no numbering."#)
}

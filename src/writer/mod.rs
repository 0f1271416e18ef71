use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::images::attribution_text;
use crate::llm::{ChatClient, ChatCompletion, ChatRequest, LlmError};
use crate::models::{Article, Image};

pub const GENERATION_TEMPERATURE: f32 = 0.7;
pub const GENERATION_MAX_TOKENS: u32 = 2500;
pub const FALLBACK_PROVIDER: &str = "fallback";
pub const FALLBACK_MODEL: &str = "template";
const MAX_CONTEXT_ARTICLES: usize = 3;

static IMAGE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*IMAGE:\s*(.*?)\s*-->").expect("valid regex")
});

/// Ask the model for a Markdown blog post on `topic`.
pub async fn generate_post(
    llm: &ChatClient,
    topic: &str,
    research_context: &str,
    model: Option<&str>,
) -> Result<ChatCompletion, LlmError> {
    let prompt = build_prompt(topic, research_context);
    tracing::info!(
        topic,
        provider = llm.provider().as_str(),
        model = model.unwrap_or(llm.model()),
        "Generating blog post"
    );

    llm.complete(ChatRequest {
        system: None,
        prompt: &prompt,
        temperature: GENERATION_TEMPERATURE,
        max_tokens: GENERATION_MAX_TOKENS,
        model,
    })
    .await
}

/// Digest of the first few articles for the generation prompt. Empty when there are none.
pub fn research_context(articles: &[Article]) -> String {
    articles
        .iter()
        .take(MAX_CONTEXT_ARTICLES)
        .enumerate()
        .map(|(i, article)| {
            format!(
                "{}. **{}**\n   URL: {}\n   Summary: {}\n",
                i + 1,
                article.title,
                article.url,
                article.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(topic: &str, research_context: &str) -> String {
    let sources = if research_context.trim().is_empty() {
        "No external sources were found. Rely on well-established knowledge.".to_string()
    } else {
        research_context.to_string()
    };

    format!(
        r###"You are an expert technical writer creating a comprehensive blog post. Write a well-structured, informative, and engaging ~1000-word blog post in Markdown format.

TOPIC: {topic}

RESEARCH SOURCES:
{sources}

REQUIREMENTS:
1. Structure:
   - Start directly with the main title (# Title)
   - Use section headings (## Section) and subsections (### Subsection) as needed
   - Use bullet points and numbered lists where appropriate
2. Content:
   - Engaging introduction, 4-6 main sections, and a conclusion with key takeaways
   - Professional yet accessible tone with concrete examples
3. Sources:
   - Weave the relevant sources into the text as inline Markdown links
   - End with a "## References" section formatted as "- [Title](URL) - Brief description"
4. Images:
   - Include 2-3 placeholders where an image would help, formatted exactly as
     <!-- IMAGE: descriptive keyword for image search -->
5. Output:
   - Return ONLY the Markdown content
   - Do NOT add explanatory text such as "Here is the blog post:"

Write the blog post now:"###
    )
}

/// Strip wrapping code fences and any preamble so the post begins with a `# ` title.
pub fn normalize_markdown(raw: &str, topic: &str) -> String {
    let body = strip_code_fence(raw);

    match title_offset(&body) {
        Some(offset) => body[offset..].trim_end().to_string(),
        None if body.is_empty() => format!("# {}", topic.trim()),
        None => format!("# {}\n\n{}", topic.trim(), body),
    }
}

pub(crate) fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(stripped) = trimmed.strip_prefix("```") {
        // Drop the info string (e.g. `markdown`) on the opening fence line.
        let after_info = stripped.split_once('\n').map_or("", |(_, rest)| rest);
        let inner = after_info.strip_suffix("```").unwrap_or(after_info);
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

fn title_offset(body: &str) -> Option<usize> {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line.trim_start().starts_with("# ") {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

pub fn extract_image_keywords(markdown: &str) -> Vec<String> {
    IMAGE_PLACEHOLDER
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn image_block(image: &Image, alt: &str) -> String {
    let alt = if alt.trim().is_empty() {
        image.alt_text.as_str()
    } else {
        alt.trim()
    };
    format!("![{}]({})\n\n*{}*", alt, image.url, attribution_text(image))
}

/// Replace image placeholders with the fetched images. Returns the new Markdown and
/// the images actually placed, in order.
pub fn embed_images(markdown: &str, images: &[Image]) -> (String, Vec<Image>) {
    let has_placeholders = IMAGE_PLACEHOLDER.is_match(markdown);

    if !has_placeholders {
        if images.is_empty() {
            return (markdown.to_string(), Vec::new());
        }
        let blocks = images
            .iter()
            .map(|image| image_block(image, &image.alt_text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let embedded = match markdown.split_once('\n') {
            Some((title, rest)) => format!("{}\n\n{}\n\n{}", title, blocks, rest.trim_start()),
            None => format!("{}\n\n{}", markdown, blocks),
        };
        return (embedded, images.to_vec());
    }

    let mut used = Vec::new();
    let replaced = IMAGE_PLACEHOLDER.replace_all(markdown, |caps: &Captures| {
        match images.get(used.len()) {
            Some(image) => {
                let alt = caps.get(1).map_or("", |m| m.as_str());
                used.push(image.clone());
                image_block(image, alt)
            }
            None => String::new(),
        }
    });

    (replaced.into_owned(), used)
}

/// Insert an `## Image Credits` section before `## References`, or append it.
pub fn add_image_credits(markdown: &str, images: &[Image]) -> String {
    if images.is_empty() {
        return markdown.to_string();
    }

    let mut credits = String::from("## Image Credits\n\n");
    for (i, image) in images.iter().enumerate() {
        credits.push_str(&format!("{}. {}\n", i + 1, attribution_text(image)));
    }

    if markdown.contains("## References") {
        markdown.replacen("## References", &format!("{}\n## References", credits), 1)
    } else {
        format!("{}\n\n{}", markdown.trim_end(), credits.trim_end())
    }
}

/// Articles whose URL appears in the post body.
pub fn used_sources<'a>(markdown: &str, articles: &'a [Article]) -> Vec<&'a Article> {
    articles
        .iter()
        .filter(|article| !article.url.is_empty() && markdown.contains(article.url.as_str()))
        .collect()
}

pub fn word_count(markdown: &str) -> usize {
    markdown.split_whitespace().count()
}

/// Static post used when no model can produce one.
pub fn fallback_post(topic: &str) -> String {
    let topic = topic.trim();
    format!(
        "# {topic}\n\n\
         This is a sample blog post about {topic}.\n\n\
         ## Introduction\n\
         Welcome to this discussion about {topic}. This is an important topic that deserves attention.\n\n\
         ## Main Content\n\
         Here are some key points about {topic}:\n\n\
         - Point 1: {topic} is relevant in today's world\n\
         - Point 2: Understanding {topic} can help in various scenarios\n\
         - Point 3: {topic} has multiple applications and benefits\n\n\
         ## Conclusion\n\
         In conclusion, {topic} is a fascinating subject that continues to evolve.\n\n\
         *Note: This is a fallback response. Configure an LLM provider for AI-generated content.*\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str) -> Image {
        Image {
            url: format!("https://img.example/{id}.jpg"),
            medium_url: None,
            photographer: "Jane".to_string(),
            photographer_url: None,
            source_url: format!("https://www.pexels.com/photo/{id}/"),
            alt_text: format!("alt {id}"),
            width: 0,
            height: 0,
            provider: "pexels".to_string(),
            provider_id: id.to_string(),
            search_query: None,
        }
    }

    #[test]
    fn prompt_embeds_topic_sources_and_format_rules() {
        let prompt = build_prompt("Solar power", "1. **Record output**\n   URL: https://a.example/1\n");
        assert!(prompt.contains("TOPIC: Solar power"));
        assert!(prompt.contains("URL: https://a.example/1"));
        assert!(prompt.contains("End with a \"## References\" section"));
        assert!(prompt.contains("<!-- IMAGE: descriptive keyword for image search -->"));
        assert!(prompt.trim_end().ends_with("Write the blog post now:"));

        let without_sources = build_prompt("Solar power", "  ");
        assert!(without_sources.contains("No external sources were found."));
    }

    #[test]
    fn normalize_strips_fence_and_preamble() {
        let raw = "```markdown\nHere is the blog post:\n\n# Solar Power\n\nBody text.\n```";
        assert_eq!(normalize_markdown(raw, "solar"), "# Solar Power\n\nBody text.");
    }

    #[test]
    fn normalize_adds_title_when_missing() {
        let normalized = normalize_markdown("## Intro\n\nText", "Renewable energy");
        assert!(normalized.starts_with("# Renewable energy\n\n## Intro"));
        assert_eq!(normalize_markdown("   ", "Topic"), "# Topic");
    }

    #[test]
    fn keywords_come_from_placeholders() {
        let markdown = "# T\n<!-- IMAGE: wind turbines -->\ntext\n<!--IMAGE:solar farm-->";
        assert_eq!(extract_image_keywords(markdown), vec!["wind turbines", "solar farm"]);
    }

    #[test]
    fn placeholders_are_replaced_in_order_and_extras_removed() {
        let markdown = "# T\n\n<!-- IMAGE: first -->\n\nA\n\n<!-- IMAGE: second -->\n\nB\n\n<!-- IMAGE: third -->";
        let (embedded, used) = embed_images(markdown, &[image("1"), image("2")]);

        assert_eq!(used.len(), 2);
        assert!(embedded.contains("![first](https://img.example/1.jpg)"));
        assert!(embedded.contains("![second](https://img.example/2.jpg)"));
        assert!(embedded.contains("*Photo by [Jane](https://www.pexels.com/photo/1/) on [Pexels](https://www.pexels.com/)*"));
        assert!(!embedded.contains("<!--"));
    }

    #[test]
    fn images_go_after_title_without_placeholders() {
        let (embedded, used) = embed_images("# Title\n\nBody", &[image("7")]);
        assert_eq!(used.len(), 1);
        assert!(embedded.starts_with("# Title\n\n![alt 7](https://img.example/7.jpg)"));
        assert!(embedded.ends_with("Body"));
    }

    #[test]
    fn credits_precede_references() {
        let markdown = "# T\n\nBody\n\n## References\n\n- [A](https://a.example)";
        let credited = add_image_credits(markdown, &[image("1")]);
        let credits_at = credited.find("## Image Credits").unwrap();
        let references_at = credited.find("## References").unwrap();
        assert!(credits_at < references_at);
        assert!(credited.contains("1. Photo by [Jane]"));

        let appended = add_image_credits("# T\n\nBody", &[image("1")]);
        assert!(appended.trim_end().ends_with("on [Pexels](https://www.pexels.com/)"));
    }

    #[test]
    fn research_context_uses_first_three_articles() {
        let articles: Vec<Article> = (1..=5)
            .map(|i| Article {
                title: format!("Title {i}"),
                url: format!("https://a.example/{i}"),
                snippet: format!("Snippet {i}"),
                age: None,
            })
            .collect();

        let context = research_context(&articles);
        assert!(context.contains("3. **Title 3**"));
        assert!(!context.contains("Title 4"));
        assert!(research_context(&[]).is_empty());

        let cited = used_sources("see https://a.example/2 for more", &articles);
        assert_eq!(cited.len(), 1);
        assert_eq!(cited[0].title, "Title 2");
    }

    #[test]
    fn fallback_post_is_a_titled_template() {
        let post = fallback_post("Quantum computing");
        assert!(post.starts_with("# Quantum computing\n"));
        assert!(post.contains("## Main Content"));
        assert!(post.contains("- Point 3: Quantum computing has multiple applications"));
    }
}

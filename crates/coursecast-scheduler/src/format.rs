//! Item-to-message formatting. Pure and total: absent optional fields render
//! as "N/A", never an error.

use coursecast_core::types::BroadcastItem;

const COURSE_LINK_BASE: &str = "https://course-orbit.vercel.app/course";

fn text(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("N/A")
}

fn integer(field: Option<i64>) -> String {
    field.map_or_else(|| "N/A".into(), |n| n.to_string())
}

fn rating(field: Option<f64>) -> String {
    field.map_or_else(|| "N/A".into(), |r| format!("{r:.2}"))
}

/// The enrollment link only exists when the feed gave us everything needed
/// to build it; otherwise it renders as a placeholder like any other field.
fn course_link(item: &BroadcastItem) -> String {
    match (&item.id_name, &item.coupon_code, item.id) {
        (Some(_), Some(_), Some(id)) => format!("{COURSE_LINK_BASE}/{id}"),
        _ => "N/A".into(),
    }
}

/// Render one feed item into the outgoing group message.
pub fn format_message(item: &BroadcastItem) -> String {
    format!(
        "📚 *Course Title*: {title}\n\
         📝 *Headline*: {headline}\n\
         🎯 *Level*: {level}\n\
         🕒 *Duration*: {duration}\n\
         🆓 *Enrolls Left*: {enrolls}\n\
         🌐 *Language*: {language}\n\
         ⭐ *Rating*: {rating}\n\
         📂 *Category*: {category}\n\
         🏷️ *Sub Category*: {subcategory}\n\
         🔗 *Link*: {link}",
        title = text(&item.title),
        headline = text(&item.headline),
        level = text(&item.instructional_level_simple),
        duration = text(&item.content_info_short),
        enrolls = integer(item.coupon_uses_remaining),
        language = text(&item.language),
        rating = rating(item.rating),
        category = text(&item.primary_category),
        subcategory = text(&item.primary_subcategory),
        link = course_link(item),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_item() -> BroadcastItem {
        serde_json::from_str(
            r#"{
                "title": "Rust for Backend Engineers",
                "headline": "Ship services that do not fall over",
                "instructional_level_simple": "Intermediate",
                "content_info_short": "12.5 total hours",
                "coupon_uses_remaining": 742,
                "language": "English",
                "rating": 4.5671,
                "primary_category": "Development",
                "primary_subcategory": "Web Development",
                "id": 98765,
                "id_name": "rust-for-backend-engineers",
                "coupon_code": "FREE2026"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_all_fields_present() {
        let message = format_message(&full_item());
        assert!(message.contains("*Course Title*: Rust for Backend Engineers"));
        assert!(message.contains("*Enrolls Left*: 742"));
        assert!(message.contains("*Rating*: 4.57"));
        assert!(message.contains("*Link*: https://course-orbit.vercel.app/course/98765"));
        assert!(!message.contains("N/A"));
    }

    #[test]
    fn test_totally_empty_item_renders_placeholders() {
        let item: BroadcastItem = serde_json::from_str("{}").unwrap();
        let message = format_message(&item);
        // Every field line renders, each with a placeholder.
        assert_eq!(message.matches("N/A").count(), 10);
    }

    #[test]
    fn test_link_requires_coupon_fields() {
        let mut item = full_item();
        item.coupon_code = None;
        let message = format_message(&item);
        assert!(message.contains("*Link*: N/A"));

        let mut item = full_item();
        item.id_name = None;
        assert!(format_message(&item).contains("*Link*: N/A"));
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let item = full_item();
        assert_eq!(format_message(&item), format_message(&item));
    }
}

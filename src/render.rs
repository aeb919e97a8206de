//! Plain-text rendering of hotbars for the command line.

use crate::models::{Hotbar, Slot};

const OCCUPIED: char = '●';
const EMPTY: char = '○';
const ACTIVE: char = '*';

/// Render one hotbar, one line per slot.
///
/// Example output:
/// ```text
/// default
///  1 ● Catalog [app]
///  2 ● minikube
///  3 ○
/// ```
pub fn render_hotbar(hotbar: &Hotbar) -> String {
    let mut output = String::new();
    output.push_str(hotbar.name());
    output.push('\n');

    let width = hotbar.capacity().to_string().len();
    for (index, slot) in hotbar.slots().iter().enumerate() {
        output.push_str(&format!(" {:>width$} ", index + 1));
        match slot {
            Slot::Empty => output.push(EMPTY),
            Slot::Occupied(entity) => {
                output.push(OCCUPIED);
                output.push(' ');
                output.push_str(entity.display_name());
                if let Some(source) = &entity.source {
                    output.push_str(&format!(" [{source}]"));
                }
            }
        }
        output.push('\n');
    }
    output
}

/// Render the hotbar picker: one display label per hotbar, the active one marked.
pub fn render_hotbar_list(hotbars: &[Hotbar], active_index: usize) -> String {
    let mut output = String::new();
    for (position, hotbar) in hotbars.iter().enumerate() {
        let marker = if position == active_index { ACTIVE } else { ' ' };
        output.push(marker);
        output.push(' ');
        output.push_str(&hotbar.display_label(position));
        output.push_str(&format!(" ({})\n", hotbar.id()));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityReference;
    use uuid::Uuid;

    #[test]
    fn test_render_hotbar() {
        let mut hotbar = Hotbar::new(Uuid::new_v4(), "default", 3);
        hotbar.add_entity(
            EntityReference::new("catalog-entity", "Catalog", Some("app".to_string())),
            None,
        );
        hotbar.add_entity(EntityReference::bare("minikube"), Some(2));

        let output = render_hotbar(&hotbar);
        assert_eq!(output, "default\n 1 ● Catalog [app]\n 2 ○\n 3 ● minikube\n");
    }

    #[test]
    fn test_render_pads_slot_numbers() {
        let hotbar = Hotbar::new(Uuid::new_v4(), "wide", 12);
        let output = render_hotbar(&hotbar);
        assert!(output.contains("\n  1 ○\n"));
        assert!(output.ends_with("\n 12 ○\n"));
    }

    #[test]
    fn test_render_hotbar_list_marks_active() {
        let first = Hotbar::new(Uuid::new_v4(), "default", 1);
        let second = Hotbar::new(Uuid::new_v4(), "work", 1);
        let output = render_hotbar_list(&[first.clone(), second.clone()], 1);

        assert_eq!(
            output,
            format!("  1: default ({})\n* 2: work ({})\n", first.id(), second.id())
        );
    }
}

//! ASCII tree rendering for the category hierarchy.

use crate::models::{Category, Folder, Instance, InstanceStatus};

const APPROVED: char = '●';
const IN_PROGRESS: char = '○';
const DRAFT: char = '◇';
const ARCHIVED: char = '✗';
const FOLDER: char = '▸';

/// Get the status symbol for an instance status.
fn status_symbol(status: InstanceStatus) -> char {
    match status {
        InstanceStatus::Approved => APPROVED,
        InstanceStatus::InProgress => IN_PROGRESS,
        InstanceStatus::Draft => DRAFT,
        InstanceStatus::Archived => ARCHIVED,
    }
}

struct Node {
    symbol: Option<char>,
    label: String,
    children: Vec<Node>,
}

fn folder_node(folder: &Folder) -> Node {
    Node {
        symbol: Some(FOLDER),
        label: format!(
            "{} [{}, {} files]",
            folder.name,
            folder.folder_type.as_str(),
            folder.files.len()
        ),
        children: Vec::new(),
    }
}

fn instance_node(instance: &Instance, with_folders: bool) -> Node {
    let children = if with_folders {
        instance.folders.iter().map(folder_node).collect()
    } else {
        Vec::new()
    };
    Node {
        symbol: Some(status_symbol(instance.status)),
        label: format!("{} ({})", instance.name, instance.version),
        children,
    }
}

/// Render categories, their instances and (optionally) each instance's
/// current folders as ASCII art.
///
/// Example output:
/// ```text
/// Combustor CFD
/// ├── ● Baseline injector (v3)
/// │   ├── ▸ Mesh [geometry, 2 files]
/// │   └── ▸ Results [result, 14 files]
/// └── ◇ Swirl study (v1)
/// ```
pub fn render_tree(categories: &[Category], with_folders: bool) -> String {
    let nodes: Vec<Node> = categories
        .iter()
        .map(|category| Node {
            symbol: None,
            label: category.name.clone(),
            children: category
                .instances
                .iter()
                .map(|instance| instance_node(instance, with_folders))
                .collect(),
        })
        .collect();

    let mut output = String::new();
    for node in &nodes {
        render_node(&mut output, node, "", true, true);
    }
    output
}

/// Recursively render a node and its children.
fn render_node(output: &mut String, node: &Node, prefix: &str, is_last: bool, is_root: bool) {
    if is_root {
        // Root nodes: label only, no branch characters
        output.push_str(&node.label);
        output.push('\n');
    } else {
        // Child nodes: branch + optional status symbol + label
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        if let Some(symbol) = node.symbol {
            output.push(symbol);
            output.push(' ');
        }
        output.push_str(&node.label);
        output.push('\n');
    }

    // Calculate prefix for children
    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    // Render children
    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FolderType;

    fn make_folder(name: &str, folder_type: FolderType) -> Folder {
        Folder {
            id: name.to_lowercase(),
            name: name.to_string(),
            folder_type,
            description: None,
            files: Vec::new(),
            risk_level: None,
            status_summary: None,
            belongs_to_version: None,
        }
    }

    fn make_instance(name: &str, status: InstanceStatus, folders: Vec<Folder>) -> Instance {
        Instance {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            summary: None,
            version: "v1".to_string(),
            status,
            owner: "lin".to_string(),
            tags: Vec::new(),
            conditions: Vec::new(),
            resource_usage: Default::default(),
            folders,
            versions: Default::default(),
            version_history: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn make_category(name: &str, instances: Vec<Instance>) -> Category {
        Category {
            id: name.to_lowercase(),
            name: name.to_string(),
            instances,
        }
    }

    #[test]
    fn test_empty_category() {
        let tree = vec![make_category("Combustor", vec![])];
        assert_eq!(render_tree(&tree, true), "Combustor\n");
    }

    #[test]
    fn test_instances_with_status_symbols() {
        let tree = vec![make_category(
            "Combustor",
            vec![
                make_instance("Baseline", InstanceStatus::Approved, vec![]),
                make_instance("Swirl", InstanceStatus::InProgress, vec![]),
                make_instance("Legacy", InstanceStatus::Archived, vec![]),
            ],
        )];
        assert_eq!(
            render_tree(&tree, true),
            "Combustor\n├── ● Baseline (v1)\n├── ○ Swirl (v1)\n└── ✗ Legacy (v1)\n"
        );
    }

    #[test]
    fn test_nested_folders() {
        let tree = vec![make_category(
            "Combustor",
            vec![
                make_instance(
                    "Baseline",
                    InstanceStatus::Approved,
                    vec![
                        make_folder("Mesh", FolderType::Geometry),
                        make_folder("Results", FolderType::Result),
                    ],
                ),
                make_instance("Swirl", InstanceStatus::Draft, vec![]),
            ],
        )];
        let expected = "Combustor\n├── ● Baseline (v1)\n│   ├── ▸ Mesh [geometry, 0 files]\n│   └── ▸ Results [result, 0 files]\n└── ◇ Swirl (v1)\n";
        assert_eq!(render_tree(&tree, true), expected);
    }

    #[test]
    fn test_without_folders() {
        let tree = vec![make_category(
            "Combustor",
            vec![make_instance(
                "Baseline",
                InstanceStatus::Approved,
                vec![make_folder("Mesh", FolderType::Geometry)],
            )],
        )];
        assert_eq!(render_tree(&tree, false), "Combustor\n└── ● Baseline (v1)\n");
    }
}

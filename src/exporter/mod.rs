//! 把分好类、写好总结的文献渲染成 Markdown 综述草稿。
//!
//! 输出只取决于 `(papers, schema, options)`，不做任何 IO。

use indexmap::IndexMap;

use crate::config::SortOrder;
use crate::models::{PaperEntry, Schema};

pub const TITLE: &str = "# 文献综述整理草稿（按大类/小类分组）";
pub const UNSPECIFIED_SUB: &str = "未指定小类";
pub const UNCATEGORIZED: &str = "未分类";

const MISSING_YEAR: i32 = -9999;
const REPRESENTATIVES: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub sort_by_year: SortOrder,
    /// 每条前加粗显示 作者 (年份), *期刊*
    pub citation_line: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sort_by_year: SortOrder::None,
            citation_line: true,
        }
    }
}

/// 大类 -> (小类 -> 文献)，均保持首次出现的顺序
type Grouped<'a> = IndexMap<&'a str, IndexMap<Option<&'a str>, Vec<&'a PaperEntry>>>;

pub fn export(papers: &[PaperEntry], schema: &Schema, options: &ExportOptions) -> String {
    let mut grouped: Grouped<'_> = IndexMap::new();
    let mut uncategorized: Vec<&PaperEntry> = Vec::new();

    for paper in papers {
        match paper.main_category.as_deref() {
            Some(main) if !main.is_empty() => grouped
                .entry(main)
                .or_default()
                .entry(paper.sub_category.as_deref())
                .or_default()
                .push(paper),
            _ => uncategorized.push(paper),
        }
    }

    // 体系内大类按体系顺序，体系外的按出现顺序排在后面
    let mut main_order: Vec<&str> = schema
        .main_names()
        .into_iter()
        .filter(|name| grouped.contains_key(name))
        .collect();
    for name in grouped.keys() {
        if !main_order.contains(name) {
            main_order.push(*name);
        }
    }

    let mut lines: Vec<String> = vec![format!("{}\n", TITLE)];

    for main in main_order {
        let Some(subs) = grouped.get(main) else {
            continue;
        };
        lines.push(format!("\n## {}\n", main));

        let declared = schema.children_of(main);
        let mut sub_order: Vec<Option<&str>> = declared.iter().map(|s| Some(s.as_str())).collect();
        for sub in subs.keys().flatten() {
            if !declared.iter().any(|d| d.as_str() == *sub) {
                sub_order.push(Some(*sub));
            }
        }
        sub_order.push(None);

        for sub in sub_order {
            let Some(items) = subs.get(&sub).filter(|items| !items.is_empty()) else {
                continue;
            };
            let heading = sub.unwrap_or(UNSPECIFIED_SUB);
            lines.push(format!("\n### {}\n", heading));
            render_section(&mut lines, sub, items, options);
        }
    }

    if !uncategorized.is_empty() {
        // 未分类部分的代表作者取排序后的顺序
        let sorted = sort_papers(&uncategorized, options.sort_by_year);
        lines.push(format!("\n## {}\n", UNCATEGORIZED));
        render_section(&mut lines, None, &sorted, options);
    }

    lines.join("\n")
}

fn render_section(
    lines: &mut Vec<String>,
    sub: Option<&str>,
    items: &[&PaperEntry],
    options: &ExportOptions,
) {
    let sorted = sort_papers(items, options.sort_by_year);

    lines.push(format!("{}\n", overview(sub, &sorted)));
    for paper in &sorted {
        lines.push(bullet(paper, options.citation_line));
    }
    // 代表作者按输入顺序选取，与条目排序无关
    lines.push(format!("\n{}\n", closing_summary(sub, items)));
}

/// 稳定排序；缺失年份视为最早
pub fn sort_papers<'a>(items: &[&'a PaperEntry], order: SortOrder) -> Vec<&'a PaperEntry> {
    let mut sorted = items.to_vec();
    let year = |paper: &PaperEntry| paper.year.unwrap_or(MISSING_YEAR);
    match order {
        SortOrder::None => {}
        SortOrder::Asc => sorted.sort_by(|a, b| year(*a).cmp(&year(*b))),
        SortOrder::Desc => sorted.sort_by(|a, b| year(*b).cmp(&year(*a))),
    }
    sorted
}

fn bullet(paper: &PaperEntry, citation_line: bool) -> String {
    if !citation_line {
        return format!("- {}", paper.summary_zh);
    }
    let year = paper
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "n.d.".to_string());
    let venue = if paper.venue.trim().is_empty() {
        String::new()
    } else {
        format!(", *{}*", paper.venue.trim())
    };
    format!(
        "- **{} ({}){}**  \n  {}",
        paper.authors.join(", "),
        year,
        venue,
        paper.summary_zh
    )
}

fn name_part(sub: Option<&str>) -> String {
    match sub {
        Some(name) if name != UNSPECIFIED_SUB => format!("“{}”这一小类", name),
        _ => "这一小类".to_string(),
    }
}

fn year_range(items: &[&PaperEntry]) -> Option<(i32, i32)> {
    let years = items.iter().filter_map(|paper| paper.year);
    let min = years.clone().min()?;
    let max = years.max()?;
    Some((min, max))
}

fn overview(sub: Option<&str>, items: &[&PaperEntry]) -> String {
    let year_part = match year_range(items) {
        Some((min, max)) if min == max => format!("，时间范围集中在 {} 年左右", min),
        Some((min, max)) => format!("，时间范围大致覆盖 {}–{} 年", min, max),
        None => String::new(),
    };
    format!(
        "{}主要汇总了 {} 篇相关工作{}。",
        name_part(sub),
        items.len(),
        year_part
    )
}

fn closing_summary(sub: Option<&str>, items: &[&PaperEntry]) -> String {
    let span_part = match year_range(items) {
        Some((min, max)) if min == max => format!("，相关研究大致分布在 {} 年", min),
        Some((min, max)) => format!("，相关研究大致分布在 {}–{} 年", min, max),
        None => String::new(),
    };
    let representatives: Vec<&str> = items
        .iter()
        .take(REPRESENTATIVES)
        .map(|paper| paper.first_author.as_str())
        .collect();
    let representatives = if representatives.is_empty() {
        "若干学者".to_string()
    } else {
        representatives.join("、")
    };

    format!(
        "综合来看，{}的工作主要围绕若干关键问题展开{}。\
         代表性的研究包括 {} 等人的工作，这些方法在公开数据集上验证了有效性，\
         为后续在真实工程场景中的推广应用奠定了基础，\
         但在跨工况泛化能力、可解释性以及与实际工业流程的深度融合方面仍有进一步提升空间。",
        name_part(sub),
        span_part,
        representatives
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: usize, author: &str, year: Option<i32>, main: Option<&str>, sub: Option<&str>) -> PaperEntry {
        let mut paper = PaperEntry::new(id, "T", "", vec![author.to_string()], year, "");
        paper.set_category(main.map(str::to_string), sub.map(str::to_string));
        paper.summary_zh = format!("{}的总结", author);
        paper
    }

    fn schema_x() -> Schema {
        let mut schema = Schema::new();
        schema.add_main("X", &["X1".to_string()]).unwrap();
        schema
    }

    fn plain() -> ExportOptions {
        ExportOptions {
            sort_by_year: SortOrder::None,
            citation_line: false,
        }
    }

    #[test]
    fn groups_by_main_and_sub() {
        let papers = vec![
            paper(0, "A", Some(2020), Some("X"), Some("X1")),
            paper(1, "B", Some(2021), Some("X"), None),
            paper(2, "C", Some(2022), Some("X"), Some("X1")),
        ];
        let markdown = export(&papers, &schema_x(), &plain());

        assert!(markdown.starts_with(TITLE));
        assert_eq!(markdown.matches("\n## ").count(), 1);
        let x1 = markdown.find("\n### X1\n").unwrap();
        let unspecified = markdown.find("\n### 未指定小类\n").unwrap();
        assert!(x1 < unspecified);

        let x1_section = &markdown[x1..unspecified];
        assert_eq!(x1_section.matches("\n- ").count(), 2);
        assert_eq!(markdown[unspecified..].matches("\n- ").count(), 1);
        assert!(x1_section.contains("“X1”这一小类主要汇总了 2 篇相关工作，时间范围大致覆盖 2020–2022 年。"));
        assert!(x1_section.contains("代表性的研究包括 A、C 等人的工作"));
        assert!(markdown.contains("这一小类主要汇总了 1 篇相关工作，时间范围集中在 2021 年左右。"));
    }

    #[test]
    fn desc_sort_puts_missing_years_last() {
        let papers = vec![
            paper(0, "Y2019", Some(2019), Some("X"), Some("X1")),
            paper(1, "Y2021", Some(2021), Some("X"), Some("X1")),
            paper(2, "YNone", None, Some("X"), Some("X1")),
        ];
        let options = ExportOptions {
            sort_by_year: SortOrder::Desc,
            citation_line: false,
        };
        let markdown = export(&papers, &schema_x(), &options);

        let positions: Vec<usize> = ["- Y2021", "- Y2019", "- YNone"]
            .iter()
            .map(|needle| markdown.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn closing_summary_keeps_input_order() {
        let papers = vec![
            paper(0, "A", Some(2019), Some("X"), Some("X1")),
            paper(1, "B", Some(2021), Some("X"), Some("X1")),
            paper(2, "C", Some(2020), Some("X"), Some("X1")),
            paper(3, "D", Some(2022), Some("X"), Some("X1")),
        ];
        let options = ExportOptions {
            sort_by_year: SortOrder::Desc,
            citation_line: false,
        };
        let markdown = export(&papers, &schema_x(), &options);

        let positions: Vec<usize> = ["- D的总结", "- B的总结", "- C的总结", "- A的总结"]
            .iter()
            .map(|needle| markdown.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(markdown.contains("代表性的研究包括 A、B、C 等人的工作"));
    }

    #[test]
    fn uncategorized_closing_summary_follows_sorted_order() {
        let papers = vec![
            paper(0, "A", Some(2019), None, None),
            paper(1, "B", Some(2021), None, None),
            paper(2, "C", Some(2020), None, None),
            paper(3, "D", Some(2022), None, None),
        ];
        let options = ExportOptions {
            sort_by_year: SortOrder::Desc,
            citation_line: false,
        };
        let markdown = export(&papers, &schema_x(), &options);

        assert!(markdown.contains("代表性的研究包括 D、B、C 等人的工作"));
    }

    #[test]
    fn sort_is_stable_for_equal_years() {
        let a = paper(0, "A", Some(2020), None, None);
        let b = paper(1, "B", Some(2020), None, None);
        let c = paper(2, "C", None, None, None);
        let items = vec![&a, &b, &c];

        let asc: Vec<&str> = sort_papers(&items, SortOrder::Asc)
            .iter()
            .map(|p| p.first_author.as_str())
            .collect();
        assert_eq!(asc, vec!["C", "A", "B"]);

        let desc: Vec<&str> = sort_papers(&items, SortOrder::Desc)
            .iter()
            .map(|p| p.first_author.as_str())
            .collect();
        assert_eq!(desc, vec!["A", "B", "C"]);
    }

    #[test]
    fn uncategorized_and_unknown_mains_are_rendered() {
        let papers = vec![
            paper(0, "Loose", None, None, None),
            paper(1, "Other", Some(2018), Some("Z"), Some("Z9")),
            paper(2, "Inside", Some(2019), Some("X"), Some("Extra")),
        ];
        let markdown = export(&papers, &schema_x(), &plain());

        let x = markdown.find("\n## X\n").unwrap();
        let z = markdown.find("\n## Z\n").unwrap();
        let none = markdown.find("\n## 未分类\n").unwrap();
        assert!(x < z && z < none);
        assert!(markdown.contains("\n### Extra\n"));
        assert!(!markdown.contains("\n### X1\n"));
        assert!(markdown[none..].contains("这一小类主要汇总了 1 篇相关工作。"));
        assert!(markdown[none..].contains("- Loose的总结"));
    }

    #[test]
    fn citation_line_formats_metadata() {
        let mut with_venue = PaperEntry::new(
            0,
            "T",
            "",
            vec!["Li Hua".to_string(), "Wang Lei".to_string()],
            Some(2020),
            "IEEE TIM",
        );
        with_venue.summary_zh = "总结".to_string();
        assert_eq!(
            bullet(&with_venue, true),
            "- **Li Hua, Wang Lei (2020), *IEEE TIM***  \n  总结"
        );

        let mut bare = PaperEntry::new(1, "T", "", vec![], None, "");
        bare.summary_zh = "总结".to_string();
        assert_eq!(bullet(&bare, true), "- **Unknown (n.d.)**  \n  总结");
        assert_eq!(bullet(&bare, false), "- 总结");
    }

    #[test]
    fn export_is_deterministic() {
        let papers = vec![
            paper(0, "A", Some(2020), Some("X"), Some("X1")),
            paper(1, "B", None, None, None),
        ];
        let options = ExportOptions::default();
        assert_eq!(
            export(&papers, &schema_x(), &options),
            export(&papers, &schema_x(), &options)
        );
    }
}

use crate::armor::ArmorRecord;
use crate::classifier::{Classifier, SlotTag};
use crate::plugin::Plugin;

/// 按槽位分组的护甲记录视图（借用自某个插件，不持久化）
#[derive(Debug, Clone)]
pub struct SlotGroup<'a> {
    pub tag: SlotTag,
    pub records: Vec<&'a ArmorRecord>,
}

impl<'a> SlotGroup<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 前 n 条记录（仅用于展示）
    pub fn sample(&self, n: usize) -> &[&'a ArmorRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

/// 对插件的护甲记录分组
///
/// 组的顺序为槽位在记录中首次出现的顺序，组内顺序与文件顺序一致。
pub fn group<'a>(plugin: &'a Plugin, classifier: &dyn Classifier) -> Vec<SlotGroup<'a>> {
    group_records(plugin.armor_records(), classifier)
}

/// 对任意记录序列分组
pub fn group_records<'a>(records: &'a [ArmorRecord], classifier: &dyn Classifier) -> Vec<SlotGroup<'a>> {
    let mut groups: Vec<SlotGroup<'a>> = Vec::new();

    for record in records {
        let tag = classifier.classify(record);
        match groups.iter_mut().find(|g| g.tag == tag) {
            Some(group) => group.records.push(record),
            None => groups.push(SlotGroup { tag, records: vec![record] }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::plugin::PluginIdentity;
    use crate::record::Record;
    use crate::subrecord::Subrecord;

    fn plugin_with(names: &[&str]) -> Plugin {
        let mut plugin = Plugin::new(PluginIdentity::from_file_name("ArmorModA.esp"));
        for (i, name) in names.iter().enumerate() {
            let mut record = Record::new(b"ARMO", 0x800 + i as u32);
            let mut edid = name.as_bytes().to_vec();
            edid.push(0);
            record.subrecords.push(Subrecord::new(b"EDID", edid));
            plugin.add_armor_record(record);
        }
        plugin
    }

    fn names(group: &SlotGroup) -> Vec<String> {
        group.records.iter().map(|r| r.display_name()).collect()
    }

    #[test]
    fn test_group_first_seen_order() {
        let plugin = plugin_with(&[
            "IronHelmet", "SteelCuirass", "LeatherGloves", "Boots01", "WoodenShield", "MysteryItem",
        ]);
        let groups = group(&plugin, &KeywordClassifier::default());

        let tags: Vec<_> = groups.iter().map(|g| g.tag).collect();
        assert_eq!(tags, vec![
            SlotTag::Head, SlotTag::Body, SlotTag::Hands, SlotTag::Feet, SlotTag::Shield, SlotTag::Unknown,
        ]);
        assert!(groups.iter().all(|g| g.len() == 1));
        assert_eq!(names(&groups[5]), vec!["MysteryItem"]);
    }

    #[test]
    fn test_group_not_alphabetical() {
        let plugin = plugin_with(&["ElvenBoots", "ElvenHelmet", "GlassBoots", "MysteryItem", "GlassHelmet"]);
        let groups = group(&plugin, &KeywordClassifier::default());

        let tags: Vec<_> = groups.iter().map(|g| g.tag).collect();
        assert_eq!(tags, vec![SlotTag::Feet, SlotTag::Head, SlotTag::Unknown]);
        assert_eq!(names(&groups[0]), vec!["ElvenBoots", "GlassBoots"]);
        assert_eq!(names(&groups[1]), vec!["ElvenHelmet", "GlassHelmet"]);
    }

    #[test]
    fn test_sample_is_bounded() {
        let plugin = plugin_with(&["Boots01", "Boots02", "Boots03"]);
        let groups = group(&plugin, &KeywordClassifier::default());

        assert_eq!(groups[0].sample(2).len(), 2);
        assert_eq!(groups[0].sample(10).len(), 3);
        assert_eq!(groups[0].len(), 3, "sample 不应修改分组");
    }

    #[test]
    fn test_empty_plugin_has_no_groups() {
        let plugin = plugin_with(&[]);
        assert!(group(&plugin, &KeywordClassifier::default()).is_empty());
    }
}

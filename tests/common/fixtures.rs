/// Items with a lazy attribute field and a greedy field capped at three columns.
pub const ITEMS_CONFIG: &str = r#"<MappingConfiguration>
  <MappingList name="Items" mappingRoot="/Root/Item">
    <Mapping name="Name" xPath="@name"/>
    <Mapping name="Tag" xPath="Tag" multiValueBehaviour="Greedy" maxValueCount="3"/>
  </MappingList>
</MappingConfiguration>"#;

pub const ITEMS_DOCUMENT: &str = r#"<Root>
  <Item name="one"><Tag>a</Tag></Item>
  <Item name="two"><Tag>b</Tag><Tag>c</Tag><Tag>d</Tag><Tag>e</Tag></Item>
</Root>"#;

/// A lazy field beside an inline field.
pub const NOTES_CONFIG: &str = r#"<MappingConfiguration>
  <MappingList name="Notes" mappingRoot="/Root">
    <Mapping name="X" xPath="X"/>
    <Mapping name="Note" xPath="Note" multiValueBehaviour="Inline"/>
  </MappingList>
</MappingConfiguration>"#;

pub const NOTES_DOCUMENT: &str =
    "<Root><X>x</X><Note>1</Note><Note>2</Note><Note>3</Note></Root>";

/// Namespaced people with nested addresses, filtered by file name and content.
pub const PEOPLE_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MappingConfiguration xmlns="urn:xml2csv:config" defaultNameFormat="Compact">
  <Namespace prefix="p" uri="urn:people"/>
  <Filter fileNameRegex="\.xml$">
    <Filter xPath="count(/p:People/p:Person) &gt; 0"/>
  </Filter>
  <MappingList name="People" mappingRoot="/p:People/p:Person">
    <Mapping name="Id" xPath="@id"/>
    <Mapping name="Name" xPath="concat(p:First, ' ', p:Last)"/>
    <MappingList name="Address" mappingRoot="p:Address">
      <Mapping name="City" xPath="p:City"/>
    </MappingList>
  </MappingList>
  <MappingList name="Phones" mappingRoot="/p:People/p:Person">
    <Mapping name="Id" xPath="@id"/>
    <Mapping name="Phone" xPath="p:Phone" multiValueBehaviour="Warn"/>
  </MappingList>
</MappingConfiguration>"#;

pub const PEOPLE_DOCUMENT: &str = r#"<?xml version="1.0"?>
<People xmlns="urn:people">
  <Person id="1">
    <First>Ada</First><Last>Lovelace</Last>
    <Address><City>London</City></Address>
    <Address><City>Ockham</City></Address>
    <Phone>111</Phone><Phone>222</Phone>
  </Person>
  <Person id="2">
    <First>Alan</First><Last>Turing</Last>
  </Person>
</People>"#;

/// A document the people filters reject by content.
pub const EMPTY_PEOPLE_DOCUMENT: &str = r#"<People xmlns="urn:people"/>"#;


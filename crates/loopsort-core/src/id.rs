use slotmap::new_key_type;

new_key_type! {
    /// Identifies an element (event, activity, gateway) in a diagram.
    pub struct ElementId;

    /// Identifies a flow (sequence, message or association edge) in a diagram.
    pub struct FlowId;

    /// Identifies a sortable element in the working arena of one sort pass.
    pub struct SortKey;
}

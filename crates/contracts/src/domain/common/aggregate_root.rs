/// Трейт для корня агрегата: статические метаданные класса
pub trait AggregateRoot {
    /// Индекс агрегата в системе (например, "a101")
    fn aggregate_index() -> &'static str;

    /// Имя коллекции для БД (например, "contact")
    fn collection_name() -> &'static str;

    /// Полное имя агрегата для системы (например, "a101_contact").
    /// Совпадает с именем таблицы и с `entity_type` в журнале аудита.
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}

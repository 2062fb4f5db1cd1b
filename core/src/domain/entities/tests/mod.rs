mod attributes_tests;
